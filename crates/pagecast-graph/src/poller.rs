//! Readiness polling for uploaded videos.
//!
//! Polls at a fixed interval, no backoff.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cancel::{run_cancellable, sleep_or_cancel};
use crate::client::{GraphClient, RawResponse};
use crate::error::{GraphError, GraphResult};
use crate::types::{AccessToken, UploadPhaseStatus, VideoStatus};

/// Polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    /// Sleep before every status check
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_secs(5),
        }
    }
}

impl GraphClient {
    /// Fetch the processing status of an uploaded asset once.
    pub async fn video_status(
        &self,
        asset_id: &str,
        token: &AccessToken,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<VideoStatus> {
        let url = self.node_url(&[asset_id]);
        let raw = run_cancellable(cancel, async {
            let response = self
                .http()
                .get(&url)
                .query(&[("fields", "status"), ("access_token", token.expose())])
                .send()
                .await?;
            RawResponse::read(response).await
        })
        .await?;

        if !raw.is_success() {
            return Err(GraphError::request(Some(raw.status), raw.error_message()));
        }
        Ok(VideoStatus::parse(&raw.json()?))
    }

    /// Poll until the upload phase reports `ready`.
    ///
    /// `error` fails with [`GraphError::Remote`]; running out of attempts
    /// fails with [`GraphError::PollTimeout`]. Transient status failures
    /// (transport, 429, 5xx) use up an attempt and polling continues.
    pub async fn wait_until_ready(
        &self,
        asset_id: &str,
        token: &AccessToken,
        poll: &PollConfig,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<VideoStatus> {
        let mut last_status = UploadPhaseStatus::Unknown.label().to_string();

        for attempt in 1..=poll.max_attempts {
            sleep_or_cancel(poll.interval, cancel).await?;

            match self.video_status(asset_id, token, cancel).await {
                Ok(status) if status.uploading_phase == UploadPhaseStatus::Ready => {
                    info!(asset_id = %asset_id, attempt, "Video ready");
                    return Ok(status);
                }
                Ok(status) if status.uploading_phase == UploadPhaseStatus::Error => {
                    return Err(GraphError::Remote {
                        asset_id: asset_id.to_string(),
                        detail: status.error_detail(),
                    });
                }
                Ok(status) => {
                    last_status = status.uploading_phase.label().to_string();
                    debug!(asset_id = %asset_id, attempt, status = %last_status, "Video not ready");
                }
                Err(e) if e.is_retryable() => {
                    warn!(asset_id = %asset_id, attempt, "Status check failed: {}", e);
                    last_status = format!("check failed: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(GraphError::PollTimeout {
            asset_id: asset_id.to_string(),
            attempts: poll.max_attempts,
            last_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            interval: Duration::ZERO,
        }
    }

    fn phase(status: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "v1",
            "status": {"video_status": "processing", "uploading_phase": {"status": status}}
        }))
    }

    async fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(GraphConfig::default().with_base_url(format!("{}/v19.0", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn test_ready_on_sixth_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .and(query_param("fields", "status"))
            .and(query_param("access_token", "tok"))
            .respond_with(phase("in_progress"))
            .up_to_n_times(5)
            .expect(5)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(phase("ready"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let status = client
            .wait_until_ready("v1", &AccessToken::new("tok"), &fast(20), &mut rx)
            .await
            .unwrap();
        assert_eq!(status.uploading_phase, UploadPhaseStatus::Ready);
    }

    #[tokio::test]
    async fn test_times_out_when_never_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(phase("in_progress"))
            .expect(4)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let err = client
            .wait_until_ready("v1", &AccessToken::new("tok"), &fast(4), &mut rx)
            .await
            .unwrap_err();

        match err {
            GraphError::PollTimeout {
                attempts, last_status, ..
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_status, "in_progress");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_error_phase_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"uploading_phase": {
                    "status": "error",
                    "errors": [{"message": "File is corrupt"}]
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let err = client
            .wait_until_ready("v1", &AccessToken::new("tok"), &fast(20), &mut rx)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Platform reported an error for v1: File is corrupt"
        );
    }

    #[tokio::test]
    async fn test_transient_status_failure_keeps_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(phase("ready"))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        assert!(client
            .wait_until_ready("v1", &AccessToken::new("tok"), &fast(3), &mut rx)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_auth_failure_stops_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v19.0/v1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"message": "Permissions error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let err = client
            .wait_until_ready("v1", &AccessToken::new("tok"), &fast(5), &mut rx)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(403));
    }

    #[tokio::test]
    async fn test_cancel_during_interval() {
        let server = MockServer::start().await;
        let client = client(&server).await;
        let (tx, mut rx) = watch::channel(false);
        let poll = PollConfig {
            max_attempts: 3,
            interval: Duration::from_secs(60),
        };

        let handle = tokio::spawn(async move {
            client
                .wait_until_ready("v1", &AccessToken::new("tok"), &poll, &mut rx)
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poll should stop on cancel")
            .unwrap();
        assert!(matches!(result, Err(GraphError::Cancelled)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

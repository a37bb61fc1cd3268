//! Graph API HTTP client.
//!
//! Holds the shared `reqwest::Client` and the request/response plumbing used
//! by the upload session, the status poller and the simple post kinds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};

use pagecast_models::DestinationId;

use crate::cancel::run_cancellable;
use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::types::{graph_error_message, AccessToken, PostResponse};

/// Status, headers of interest and body of a finished request.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub offset_header: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub async fn read(response: reqwest::Response) -> GraphResult<Self> {
        let status = response.status().as_u16();
        let offset_header = response
            .headers()
            .get("offset")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(Self {
            status,
            offset_header,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON; an empty body reads as `{}`.
    pub fn json(&self) -> GraphResult<Value> {
        if self.body.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&self.body)
            .map_err(|e| GraphError::invalid_response(format!("HTTP {} body is not JSON: {}", self.status, e)))
    }

    pub fn error_message(&self) -> String {
        let message = graph_error_message(&self.body);
        if message.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            message
        }
    }
}

/// Image to attach to a photo post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Publicly reachable image the platform fetches itself
    Url(String),
    /// Local file sent as a multipart `source` part
    File(PathBuf),
}

/// Facebook Graph API client.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    config: Arc<GraphConfig>,
}

impl GraphClient {
    /// Create a client with its own connection pool.
    pub fn new(config: GraphConfig) -> GraphResult<Self> {
        if config.chunk_size == 0 {
            return Err(GraphError::Config("chunk size must be positive".to_string()));
        }
        url::Url::parse(config.normalized_base())
            .map_err(|e| GraphError::Config(format!("invalid Graph API base URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> GraphResult<Self> {
        Self::new(GraphConfig::from_env())
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// `{base}/{segment}/{segment}...`
    pub fn node_url(&self, segments: &[&str]) -> String {
        format!("{}/{}", self.config.normalized_base(), segments.join("/"))
    }

    /// Publish a text post to the destination's feed.
    pub async fn publish_text(
        &self,
        destination: &DestinationId,
        token: &AccessToken,
        message: &str,
        scheduled_at: Option<DateTime<Utc>>,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<PostResponse> {
        let url = self.node_url(&[destination.as_str(), "feed"]);
        let mut body = json!({
            "message": message,
            "access_token": token.expose(),
        });
        if let Some(at) = scheduled_at {
            body["scheduled_publish_time"] = json!(at.timestamp());
            body["published"] = json!(false);
        }

        debug!(destination_id = %destination, "Publishing text post");
        let raw = run_cancellable(cancel, async {
            let response = self.http.post(&url).json(&body).send().await?;
            RawResponse::read(response).await
        })
        .await?;

        let post = parse_post(&raw)?;
        info!(destination_id = %destination, post_id = %post.id, "Text post published");
        Ok(post)
    }

    /// Publish a photo post from a URL or a local file.
    pub async fn publish_image(
        &self,
        destination: &DestinationId,
        token: &AccessToken,
        image: &ImageSource,
        caption: Option<&str>,
        scheduled_at: Option<DateTime<Utc>>,
        cancel: &mut watch::Receiver<bool>,
    ) -> GraphResult<PostResponse> {
        let url = self.node_url(&[destination.as_str(), "photos"]);

        let raw = match image {
            ImageSource::Url(image_url) => {
                let mut body = json!({
                    "url": image_url,
                    "access_token": token.expose(),
                });
                if let Some(caption) = caption {
                    body["caption"] = json!(caption);
                }
                if let Some(at) = scheduled_at {
                    body["scheduled_publish_time"] = json!(at.timestamp());
                    body["published"] = json!(false);
                }

                run_cancellable(cancel, async {
                    let response = self.http.post(&url).json(&body).send().await?;
                    RawResponse::read(response).await
                })
                .await?
            }
            ImageSource::File(path) => {
                let form = image_form(path, token, caption, scheduled_at).await?;
                run_cancellable(cancel, async {
                    let response = self.http.post(&url).multipart(form).send().await?;
                    RawResponse::read(response).await
                })
                .await?
            }
        };

        let post = parse_post(&raw)?;
        info!(destination_id = %destination, post_id = %post.id, "Image post published");
        Ok(post)
    }
}

fn parse_post(raw: &RawResponse) -> GraphResult<PostResponse> {
    if !raw.is_success() {
        return Err(GraphError::request(Some(raw.status), raw.error_message()));
    }
    PostResponse::parse(&raw.json()?)
}

async fn image_form(
    path: &Path,
    token: &AccessToken,
    caption: Option<&str>,
    scheduled_at: Option<DateTime<Utc>>,
) -> GraphResult<Form> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    let mut form = Form::new()
        .part("source", Part::bytes(data).file_name(file_name))
        .text("access_token", token.expose().to_string());
    if let Some(caption) = caption {
        form = form.text("caption", caption.to_string());
    }
    if let Some(at) = scheduled_at {
        form = form
            .text("scheduled_publish_time", at.timestamp().to_string())
            .text("published", "false");
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, body_string_contains, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GraphClient {
        GraphClient::new(GraphConfig::default().with_base_url(format!("{}/v19.0/", server.uri()))).unwrap()
    }

    #[test]
    fn test_node_url_normalizes_base() {
        let client = GraphClient::new(GraphConfig::default().with_base_url("https://graph.test/v19.0/")).unwrap();
        assert_eq!(
            client.node_url(&["123", "videos"]),
            "https://graph.test/v19.0/123/videos"
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(GraphClient::new(GraphConfig::default().with_base_url("not a url")).is_err());
        assert!(GraphClient::new(GraphConfig::default().with_chunk_size(0)).is_err());
    }

    #[tokio::test]
    async fn test_publish_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/page-1/feed"))
            .and(body_partial_json(json!({"message": "hello", "access_token": "tok"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "page-1_42"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let post = client
            .publish_text(&"page-1".into(), &AccessToken::new("tok"), "hello", None, &mut rx)
            .await
            .unwrap();
        assert_eq!(post.id, "page-1_42");
    }

    #[tokio::test]
    async fn test_publish_image_url_surfaces_graph_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/page-1/photos"))
            .and(body_partial_json(json!({"url": "https://cdn.test/a.jpg", "caption": "hi"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "(#324) Requires upload file", "code": 324}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let err = client
            .publish_image(
                &"page-1".into(),
                &AccessToken::new("tok"),
                &ImageSource::Url("https://cdn.test/a.jpg".into()),
                Some("hi"),
                None,
                &mut rx,
            )
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), Some(400));
        assert!(err.to_string().contains("Requires upload file"));
    }

    #[tokio::test]
    async fn test_publish_image_file_uses_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/page-1/photos"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .and(body_string_contains("name=\"source\""))
            .and(body_string_contains("name=\"access_token\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "photo-1", "post_id": "page-1_7"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pic.jpg");
        std::fs::write(&image, b"fake-jpeg-bytes").unwrap();

        let client = client_for(&server).await;
        let (_tx, mut rx) = watch::channel(false);
        let post = client
            .publish_image(
                &"page-1".into(),
                &AccessToken::new("tok"),
                &ImageSource::File(image),
                None,
                None,
                &mut rx,
            )
            .await
            .unwrap();
        assert_eq!(post.id, "page-1_7");
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        let (_tx, mut rx) = watch::channel(true);

        let err = client
            .publish_text(&"page-1".into(), &AccessToken::new("tok"), "hi", None, &mut rx)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

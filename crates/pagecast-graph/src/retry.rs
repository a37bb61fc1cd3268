//! Per-chunk retry policy with exponential backoff.
//!
//! Retries on transport failures, HTTP 429 and HTTP 5xx. Any other 4xx is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tracing::warn;

use crate::cancel::sleep_or_cancel;
use crate::error::GraphResult;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("UPLOAD_CHUNK_RETRIES").unwrap_or(defaults.max_retries),
            base_delay_ms: env_parse("UPLOAD_RETRY_BASE_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: env_parse("UPLOAD_RETRY_MAX_MS").unwrap_or(defaults.max_delay_ms),
        }
    }

    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp_delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exp_delay.min(self.max_delay_ms))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Execute an async operation, retrying retryable failures.
///
/// Backoff sleeps observe `cancel`; a cancellation during a sleep ends the
/// loop with [`GraphError::Cancelled`](crate::GraphError::Cancelled).
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    cancel: &mut watch::Receiver<bool>,
    mut op: F,
) -> GraphResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GraphResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Graph request failed, retrying: {}",
                    e
                );
                counter!("pagecast_graph_retries_total", "operation" => operation.to_string())
                    .increment(1);

                sleep_or_cancel(delay, cancel).await?;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let (_tx, mut rx) = watch::channel(false);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value = with_retry(&fast(), "test", &mut rx, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(GraphError::request(Some(503), "unavailable"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (_tx, mut rx) = watch::channel(false);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = with_retry(&fast(), "test", &mut rx, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GraphError::request(Some(400), "bad request"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.http_status(), Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let (_tx, mut rx) = watch::channel(false);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = with_retry(&fast(), "test", &mut rx, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GraphError::request(Some(500), "boom"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.http_status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

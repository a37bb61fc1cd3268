//! Graph client configuration.

use std::time::Duration;

use crate::retry::RetryConfig;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Bytes sent per transfer request.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Consecutive chunks without offset progress before the upload is abandoned.
pub const DEFAULT_MAX_STALLED_CHUNKS: u32 = 3;

/// Graph client configuration.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// API root including the version segment
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub chunk_size: usize,
    pub chunk_retry: RetryConfig,
    pub max_stalled_chunks: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_retry: RetryConfig::default(),
            max_stalled_chunks: DEFAULT_MAX_STALLED_CHUNKS,
        }
    }
}

impl GraphConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("FACEBOOK_GRAPH_API_BASE_URL")
            .or_else(|_| std::env::var("NEXT_PUBLIC_FACEBOOK_GRAPH_API_BASE_URL"))
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = std::env::var("GRAPH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let chunk_size = std::env::var("UPLOAD_CHUNK_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.chunk_size);

        Self {
            base_url,
            request_timeout,
            chunk_size,
            chunk_retry: RetryConfig::from_env(),
            max_stalled_chunks: defaults.max_stalled_chunks,
        }
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_retry(mut self, retry: RetryConfig) -> Self {
        self.chunk_retry = retry;
        self
    }

    /// API root without a trailing slash.
    pub fn normalized_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.base_url, "https://graph.facebook.com/v19.0");
        assert_eq!(config.chunk_size, 4_194_304);
        assert_eq!(config.max_stalled_chunks, 3);
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let config = GraphConfig::default().with_base_url("http://localhost:9000/v19.0//");
        assert_eq!(config.normalized_base(), "http://localhost:9000/v19.0");
    }
}

//! Publisher configuration.

use std::time::Duration;

use pagecast_graph::PollConfig;

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Pause between two destinations of one batch
    pub post_interval: Duration,
    /// Readiness polling budget for requests that wait
    pub poll: PollConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            post_interval: Duration::from_secs(2),
            poll: PollConfig::default(),
        }
    }
}

impl PublisherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            post_interval: std::env::var("POST_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.post_interval),
            poll: PollConfig {
                max_attempts: std::env::var("STATUS_POLL_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.poll.max_attempts),
                interval: std::env::var("STATUS_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.poll.interval),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PublisherConfig::default();
        assert_eq!(config.post_interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, 20);
        assert_eq!(config.poll.interval, Duration::from_secs(5));
    }
}

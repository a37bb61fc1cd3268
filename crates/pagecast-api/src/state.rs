//! Application state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use pagecast_graph::GraphClient;
use pagecast_media::{check_ffmpeg, check_ffprobe, FfmpegTranscoder, TranscodeConfig};
use pagecast_publisher::{InMemoryCredentialStore, Publisher, PublisherConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub publisher: Publisher,
    /// Where uploads and transcoded outputs live
    pub work_dir: PathBuf,
    /// Flips to `true` on server shutdown; in-flight work stops at the next check
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<Self> {
        let credentials = InMemoryCredentialStore::load(&config.pages_file).await?;
        if credentials.is_empty() {
            warn!(path = %config.pages_file.display(), "No page credentials configured");
        }

        if let Err(e) = check_ffmpeg().and_then(|_| check_ffprobe()) {
            warn!("Transcoding unavailable: {}", e);
        }

        let mut transcode = TranscodeConfig::from_env();
        transcode.work_dir = prepare_work_dir(&transcode.work_dir).await?;
        let work_dir = transcode.work_dir.clone();

        let graph = GraphClient::from_env()?;
        info!(base_url = %graph.config().base_url, "Graph API client ready");

        let publisher = Publisher::new(
            graph,
            Arc::new(credentials),
            Arc::new(FfmpegTranscoder::new(transcode)),
            PublisherConfig::from_env(),
        );

        Ok(Self::from_parts(config, publisher, work_dir, shutdown))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: ApiConfig,
        publisher: Publisher,
        work_dir: PathBuf,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            publisher,
            work_dir,
            shutdown,
        }
    }
}

/// Create the work directory and return its absolute form.
///
/// Transcoded paths handed to clients are built from this directory and
/// must resolve to the same file when they are sent back.
pub(crate) async fn prepare_work_dir(dir: &Path) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::canonicalize(dir).await
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::paths::resolve_within;

    #[tokio::test]
    async fn test_relative_work_dir_round_trips_output_paths() {
        let scratch = tempfile::tempdir_in(".").unwrap();
        let relative = scratch.path().join("work");
        assert!(relative.is_relative());

        let work_dir = assert_ok!(prepare_work_dir(&relative).await);
        assert!(work_dir.is_absolute());

        // A path produced under the work dir comes back as the same file
        let produced = work_dir.join("processed-1.mp4");
        std::fs::write(&produced, b"mp4").unwrap();
        let resolved = assert_ok!(resolve_within(&work_dir, &produced));
        assert_eq!(resolved, produced);
        assert!(resolved.exists());
    }
}

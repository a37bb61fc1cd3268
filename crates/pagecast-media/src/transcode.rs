//! Normalize a source video to the vertical upload profile.
//!
//! One job probes the source, computes a centered 9:16 crop, and encodes the
//! cropped region scaled to 1080x1920 into a uniquely named file in the work
//! directory. The source is never touched; a partially written output is
//! removed before an error is returned.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use tokio::fs;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use pagecast_models::{CropRect, TranscodeProfile};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::crop::compute_centered_crop;
use crate::error::{MediaError, MediaResult, TranscodeReason};
use crate::fs_utils::{unique_scratch_path, ScratchFile};
use crate::probe::probe_media;

/// Transcoder configuration.
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    /// Directory for transcoded outputs
    pub work_dir: PathBuf,
    /// Kill FFmpeg after this long
    pub timeout: Option<Duration>,
    pub profile: TranscodeProfile,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/pagecast"),
            timeout: Some(Duration::from_secs(1800)),
            profile: TranscodeProfile::vertical(),
        }
    }
}

impl TranscodeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("FFMPEG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1800);

        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/pagecast")),
            // 0 disables the timeout
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            profile: TranscodeProfile::vertical(),
        }
    }
}

/// A finished transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodedMedia {
    pub path: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub crop: CropRect,
    pub size_bytes: u64,
}

/// Produces upload-ready video from a source file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `source` into a new file owned by the caller.
    async fn transcode(
        &self,
        source: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<TranscodedMedia>;
}

/// [`Transcoder`] backed by the FFmpeg and FFprobe CLIs.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Build the encode command for one crop.
    pub fn build_command(&self, source: &Path, output: &Path, crop: &CropRect) -> FfmpegCommand {
        let profile = &self.config.profile;
        FfmpegCommand::new(source, output)
            .video_filter(format!("{},{}", crop.to_ffmpeg_filter(), profile.scale_filter()))
            .output_args(profile.to_ffmpeg_args())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<TranscodedMedia> {
        let probe = probe_media(source)
            .await
            .map_err(|e| MediaError::transcode(TranscodeReason::ProbeFailed, e))?;

        let video = probe.video.ok_or_else(|| {
            MediaError::transcode(
                TranscodeReason::NoVideoStream,
                format!("no video stream with dimensions in {}", source.display()),
            )
        })?;

        let crop = compute_centered_crop(video.width, video.height).ok_or_else(|| {
            MediaError::transcode(TranscodeReason::NoVideoStream, "video stream has empty frame")
        })?;

        fs::create_dir_all(&self.config.work_dir).await?;
        let output = ScratchFile::new(unique_scratch_path(&self.config.work_dir, "processed", "mp4"));

        info!(
            source = %source.display(),
            output = %output.path().display(),
            width = video.width,
            height = video.height,
            crop = %crop.to_ffmpeg_filter(),
            "Transcoding video"
        );

        let cmd = self.build_command(source, output.path(), &crop);
        let mut runner = FfmpegRunner::new().with_cancel(cancel);
        if let Some(timeout) = self.config.timeout {
            runner = runner.with_timeout(timeout);
        }

        let total_secs = probe.duration;
        let started = Instant::now();
        let encoded = runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    frame = progress.frame,
                    percent = progress.percentage(total_secs),
                    "Transcode progress"
                );
            })
            .await;

        let output = settle_encode(output, encoded).await?;

        let elapsed = started.elapsed().as_secs_f64();
        histogram!("pagecast_transcode_duration_seconds").record(elapsed);

        let size_bytes = fs::metadata(output.path()).await?.len();
        let path = output.keep();

        info!(
            output = %path.display(),
            size_bytes,
            elapsed_secs = elapsed,
            "Transcode complete"
        );

        Ok(TranscodedMedia {
            path,
            source_width: video.width,
            source_height: video.height,
            crop,
            size_bytes,
        })
    }
}

/// Keep `output` if the encode succeeded; otherwise remove whatever was
/// written and map the runner error.
async fn settle_encode(output: ScratchFile, encoded: MediaResult<()>) -> MediaResult<ScratchFile> {
    let Err(e) = encoded else {
        return Ok(output);
    };

    let path = output.path().to_path_buf();
    if let Err(cleanup_err) = output.remove().await {
        warn!("Failed to remove partial output {}: {}", path.display(), cleanup_err);
    }
    Err(match e {
        MediaError::Cancelled => MediaError::Cancelled,
        other => MediaError::transcode(TranscodeReason::EncodeFailed, other),
    })
}

#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for preparing videos before upload.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeout support via tokio
//! - Centered 9:16 crop computation
//! - The transcode step that normalizes uploads to 1080x1920
//! - Scratch file handling with guaranteed cleanup

pub mod command;
pub mod crop;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod transcode;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use crop::compute_centered_crop;
pub use error::{MediaError, MediaResult, TranscodeReason};
pub use fs_utils::{remove_scratch_file, unique_scratch_path, CleanupOutcome, ScratchFile};
pub use probe::{probe_media, MediaProbe, VideoStreamInfo};
pub use progress::FfmpegProgress;
pub use transcode::{FfmpegTranscoder, TranscodeConfig, TranscodedMedia, Transcoder};

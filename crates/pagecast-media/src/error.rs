//! Error types for media operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Why a transcode job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeReason {
    /// FFprobe could not read the source
    ProbeFailed,
    /// No video stream, or one without readable dimensions
    NoVideoStream,
    /// FFmpeg failed while encoding
    EncodeFailed,
}

impl TranscodeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeReason::ProbeFailed => "probe-failed",
            TranscodeReason::NoVideoStream => "no-video-stream",
            TranscodeReason::EncodeFailed => "encode-failed",
        }
    }
}

impl fmt::Display for TranscodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Transcode failed ({reason}): {}", .underlying.as_deref().unwrap_or("no further details"))]
    Transcode {
        reason: TranscodeReason,
        underlying: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a transcode failure carrying the underlying error text.
    pub fn transcode(reason: TranscodeReason, underlying: impl fmt::Display) -> Self {
        Self::Transcode {
            reason,
            underlying: Some(underlying.to_string()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Transcode reason, if this is a transcode failure.
    pub fn transcode_reason(&self) -> Option<TranscodeReason> {
        match self {
            MediaError::Transcode { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_error_message() {
        let err = MediaError::transcode(TranscodeReason::NoVideoStream, "stream 0 is audio");
        assert_eq!(
            err.to_string(),
            "Transcode failed (no-video-stream): stream 0 is audio"
        );
        assert_eq!(err.transcode_reason(), Some(TranscodeReason::NoVideoStream));

        let bare = MediaError::Transcode {
            reason: TranscodeReason::EncodeFailed,
            underlying: None,
        };
        assert_eq!(
            bare.to_string(),
            "Transcode failed (encode-failed): no further details"
        );
    }
}

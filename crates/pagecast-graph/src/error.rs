//! Graph API error types.

use thiserror::Error;

/// Result type for Graph API operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while talking to the Graph API.
///
/// Each upload phase has its own variant so a failed post can say which
/// step broke.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Upload start failed: {message}")]
    UploadStart {
        status: Option<u16>,
        message: String,
    },

    #[error("Chunk upload failed at offset {offset}{}: {body}", http_suffix(.status))]
    UploadTransfer {
        /// `None` when no response was received
        status: Option<u16>,
        body: String,
        offset: u64,
    },

    #[error("Upload finish failed: {message}")]
    UploadFinish {
        status: Option<u16>,
        message: String,
    },

    #[error("Upload offset protocol violated: {0}")]
    OffsetProtocol(String),

    #[error("Platform reported an error for {asset_id}: {detail}")]
    Remote { asset_id: String, detail: String },

    #[error("{asset_id} not ready after {attempts} status checks (last status: {last_status})")]
    PollTimeout {
        asset_id: String,
        attempts: u32,
        last_status: String,
    },

    #[error("Request failed{}: {message}", http_suffix(.status))]
    Request {
        status: Option<u16>,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl GraphError {
    pub fn upload_start(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UploadStart {
            status,
            message: message.into(),
        }
    }

    pub fn upload_finish(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UploadFinish {
            status,
            message: message.into(),
        }
    }

    pub fn request(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// HTTP status of the failed response, if there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::UploadStart { status, .. }
            | Self::UploadTransfer { status, .. }
            | Self::UploadFinish { status, .. }
            | Self::Request { status, .. } => *status,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    ///
    /// Transport failures, 429 and 5xx are; every other 4xx is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.status().map_or(true, |s| is_transient_status(s.as_u16())),
            Self::UploadTransfer { status, .. } | Self::Request { status, .. } => {
                status.map_or(true, is_transient_status)
            }
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

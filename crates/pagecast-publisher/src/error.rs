//! Publisher error types.

use thiserror::Error;

use pagecast_graph::GraphError;
use pagecast_media::MediaError;
use pagecast_models::{DestinationId, RequestError};

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors raised while publishing.
///
/// `InvalidRequest` and `Transcode` fail a whole batch; everything else is
/// recorded on the outcome of the destination it happened for.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("No credential for destination {0}")]
    CredentialNotFound(DestinationId),

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error(transparent)]
    Transcode(#[from] MediaError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    pub fn credential_store(msg: impl Into<String>) -> Self {
        Self::CredentialStore(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Graph(e) => e.is_cancelled(),
            Self::Transcode(e) => matches!(e, MediaError::Cancelled),
            _ => false,
        }
    }
}

//! Structured per-destination publish logging.

use std::fmt::Display;

use tracing::{error, info, Span};

use pagecast_models::{ContentKind, DestinationId, PublishStage};

/// Logs the lifecycle of one destination within a batch.
#[derive(Debug, Clone)]
pub struct PostLogger {
    batch_id: String,
    destination_id: String,
    kind: ContentKind,
}

impl PostLogger {
    pub fn new(batch_id: &str, destination: &DestinationId, kind: ContentKind) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            destination_id: destination.to_string(),
            kind,
        }
    }

    pub fn log_start(&self) {
        info!(
            batch_id = %self.batch_id,
            destination_id = %self.destination_id,
            kind = self.kind.as_str(),
            "Publishing to destination"
        );
    }

    /// Log entering a pipeline stage.
    pub fn log_stage(&self, stage: PublishStage) {
        info!(
            batch_id = %self.batch_id,
            destination_id = %self.destination_id,
            kind = self.kind.as_str(),
            stage = stage.as_str(),
            "Stage reached"
        );
    }

    pub fn log_failure(&self, stage: PublishStage, err: &dyn Display) {
        error!(
            batch_id = %self.batch_id,
            destination_id = %self.destination_id,
            kind = self.kind.as_str(),
            failed_at = stage.as_str(),
            "Publish failed: {}", err
        );
    }

    pub fn log_success(&self, remote_id: &str) {
        info!(
            batch_id = %self.batch_id,
            destination_id = %self.destination_id,
            kind = self.kind.as_str(),
            remote_id = %remote_id,
            "Published"
        );
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    /// Span covering all work for this destination.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "publish",
            batch_id = %self.batch_id,
            destination_id = %self.destination_id,
            kind = self.kind.as_str()
        )
    }
}

//! Per-destination outcomes and batch summaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::DestinationId;

/// Stage a destination reached in the publish pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    Pending,
    CredentialResolved,
    Transcoding,
    SessionStarted,
    Transferring,
    Finishing,
    Finished,
    Polling,
    Ready,
}

impl PublishStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStage::Pending => "pending",
            PublishStage::CredentialResolved => "credential_resolved",
            PublishStage::Transcoding => "transcoding",
            PublishStage::SessionStarted => "session_started",
            PublishStage::Transferring => "transferring",
            PublishStage::Finishing => "finishing",
            PublishStage::Finished => "finished",
            PublishStage::Polling => "polling",
            PublishStage::Ready => "ready",
        }
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of publishing to one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub destination_id: DestinationId,
    pub success: bool,
    /// Remote post/video id reported to the user as the post id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Last stage reached before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<PublishStage>,
}

impl UploadOutcome {
    pub fn succeeded(destination_id: DestinationId, remote_asset_id: impl Into<String>) -> Self {
        Self {
            destination_id,
            success: true,
            remote_asset_id: Some(remote_asset_id.into()),
            error_message: None,
            failed_at: None,
        }
    }

    pub fn failed(
        destination_id: DestinationId,
        stage: PublishStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            destination_id,
            success: false,
            remote_asset_id: None,
            error_message: Some(message.into()),
            failed_at: Some(stage),
        }
    }
}

/// User-facing summary of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchSummary {
    AllSucceeded { count: usize },
    Partial { succeeded: usize, failed: usize },
    AllFailed { count: usize },
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[UploadOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        match (succeeded, failed) {
            (count, 0) => BatchSummary::AllSucceeded { count },
            (0, count) => BatchSummary::AllFailed { count },
            (succeeded, failed) => BatchSummary::Partial { succeeded, failed },
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSummary::AllSucceeded { count } => write!(f, "All {} posts succeeded", count),
            BatchSummary::Partial { succeeded, failed } => {
                write!(f, "Partial success: {} succeeded, {} failed", succeeded, failed)
            }
            BatchSummary::AllFailed { count } => write!(f, "All {} posts failed", count),
        }
    }
}

/// Outcomes of a batch in destination order, plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<UploadOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(outcomes: Vec<UploadOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self { outcomes, summary }
    }

    /// Failed outcomes with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(id: &str) -> UploadOutcome {
        UploadOutcome::succeeded(id.into(), format!("video-{}", id))
    }

    fn err(id: &str) -> UploadOutcome {
        UploadOutcome::failed(id.into(), PublishStage::Pending, "no credential")
    }

    #[test]
    fn test_summary_variants() {
        assert_eq!(
            BatchSummary::from_outcomes(&[ok("a"), ok("b")]),
            BatchSummary::AllSucceeded { count: 2 }
        );
        assert_eq!(
            BatchSummary::from_outcomes(&[ok("a"), err("b"), ok("c")]),
            BatchSummary::Partial {
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(
            BatchSummary::from_outcomes(&[err("a")]),
            BatchSummary::AllFailed { count: 1 }
        );
    }

    #[test]
    fn test_report_failures() {
        let report = BatchReport::new(vec![ok("a"), err("b")]);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error_message.as_deref(), Some("no credential"));
        assert_eq!(report.summary.to_string(), "Partial success: 1 succeeded, 1 failed");
    }

    #[test]
    fn test_outcome_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ok("a")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error_message").is_none());
        assert!(json.get("failed_at").is_none());
    }
}

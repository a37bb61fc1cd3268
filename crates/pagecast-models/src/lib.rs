//! Shared data models for the Pagecast backend.
//!
//! This crate provides Serde-serializable types for:
//! - Publish requests and their validation rules
//! - Per-destination outcomes and batch summaries
//! - Crop rectangles and the upload encoding profile

pub mod encoding;
pub mod outcome;
pub mod rect;
pub mod request;

// Re-export common types
pub use encoding::TranscodeProfile;
pub use outcome::{BatchReport, BatchSummary, PublishStage, UploadOutcome};
pub use rect::CropRect;
pub use request::{ContentKind, DestinationId, MediaSource, RequestError, UploadRequest};

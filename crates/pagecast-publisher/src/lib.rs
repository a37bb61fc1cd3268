//! Batch publishing to Facebook Pages.
//!
//! [`Publisher::post_media`] validates a request, transcodes video once,
//! then publishes to each destination in order, pacing between them. Every
//! destination gets an outcome; the batch summary says whether all, some or
//! none succeeded.

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod orchestrator;

pub use config::PublisherConfig;
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use error::{PublishError, PublishResult};
pub use logging::PostLogger;
pub use orchestrator::Publisher;

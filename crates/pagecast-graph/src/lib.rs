//! Facebook Graph API client for page publishing.
//!
//! - [`GraphClient::upload`]: resumable video/reel upload (start, chunked
//!   transfer, finish)
//! - [`GraphClient::wait_until_ready`]: fixed-interval status polling
//! - [`GraphClient::publish_text`] and [`GraphClient::publish_image`]: single
//!   request posts
//!
//! Every network call takes a `watch::Receiver<bool>` cancel signal.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod retry;
pub mod session;
pub mod types;

pub use client::{GraphClient, ImageSource};
pub use config::{GraphConfig, DEFAULT_CHUNK_SIZE, DEFAULT_GRAPH_BASE_URL};
pub use error::{GraphError, GraphResult};
pub use poller::PollConfig;
pub use retry::RetryConfig;
pub use session::{chunk_count, PublishOptions, UploadPayload, UploadReceipt, UploadSession};
pub use types::{
    AccessToken, FinishResponse, PostResponse, StartResponse, TransferAck, UploadKind,
    UploadPhaseStatus, VideoStatus,
};

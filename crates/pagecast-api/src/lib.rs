//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video transcoding and scratch file cleanup endpoints
//! - Batch publishing to Facebook Pages
//! - Single-shot video status lookups
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod paths;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "pagecast_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pagecast_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pagecast_http_requests_in_flight";

    // Cleanup
    pub const FILES_CLEANED_TOTAL: &str = "pagecast_files_cleaned_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a cleanup request by what it found.
pub fn record_file_cleaned(outcome: &'static str) {
    counter!(names::FILES_CLEANED_TOTAL, "outcome" => outcome).increment(1);
}

/// Sanitize path for metrics labels.
///
/// The only path parameter is the video id in `/api/videos/{id}/...`.
fn sanitize_path(path: &str) -> String {
    let mut out = Vec::new();
    let mut after_videos = false;
    for segment in path.split('/') {
        if after_videos && !segment.is_empty() {
            out.push(":video_id");
        } else {
            out.push(segment);
        }
        after_videos = segment == "videos";
    }
    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

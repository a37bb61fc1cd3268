//! Batch publishing handler.

use axum::extract::State;
use axum::Json;
use tracing::info;

use pagecast_models::{BatchReport, MediaSource, UploadRequest};

use crate::error::ApiResult;
use crate::paths::resolve_within;
use crate::state::AppState;

/// Publish one request to all of its destinations.
///
/// Per-destination failures are part of the returned report. Only an
/// invalid request or a failed transcode turn into an error response.
pub async fn create_posts(
    State(state): State<AppState>,
    Json(mut request): Json<UploadRequest>,
) -> ApiResult<Json<BatchReport>> {
    // Local media must come from the work directory
    match request.media.as_mut() {
        Some(MediaSource::RawFile { path }) | Some(MediaSource::PreparedFile { path }) => {
            *path = resolve_within(&state.work_dir, path.as_path())?;
        }
        Some(MediaSource::RemoteUrl { .. }) | None => {}
    }

    let report = state
        .publisher
        .post_media(request, state.shutdown.clone())
        .await?;

    info!(summary = %report.summary, "Publish request finished");
    Ok(Json(report))
}

//! Video status handler.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use pagecast_models::DestinationId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Page the video was uploaded to; its token is used for the lookup
    pub page_id: String,
}

/// Fetch the platform's status document for an uploaded video, once.
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    let page_id = query.page_id.trim();
    if page_id.is_empty() {
        return Err(ApiError::bad_request("page_id is required"));
    }

    let status = state
        .publisher
        .video_status(&DestinationId::new(page_id), &video_id, state.shutdown.clone())
        .await?;

    Ok(Json(status.raw))
}

//! Transcode and cleanup handlers.

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use pagecast_media::{remove_scratch_file, unique_scratch_path, CleanupOutcome, ScratchFile};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_file_cleaned;
use crate::paths::resolve_within;
use crate::state::AppState;

/// Multipart field carrying the source video.
pub const VIDEO_FIELD: &str = "video";

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscodeResponse {
    pub processed_video_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    #[serde(alias = "filePath")]
    pub file_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accept an uploaded video and return the path of its upload-ready copy.
///
/// The uploaded source is deleted whether or not the transcode succeeds;
/// the transcoded file belongs to the caller until it is cleaned up.
pub async fn transcode_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TranscodeResponse>> {
    let upload = save_video_field(&state.work_dir, &mut multipart).await?;

    let result = state
        .publisher
        .transcode(upload.path(), state.shutdown.clone())
        .await;

    if let Err(e) = upload.remove().await {
        warn!("Failed to remove uploaded source: {}", e);
    }

    let media = result?;
    info!(
        output = %media.path.display(),
        size_bytes = media.size_bytes,
        "Video transcoded"
    );

    Ok(Json(TranscodeResponse {
        processed_video_path: media.path,
    }))
}

/// Delete a file from the work directory.
///
/// Deleting a file that is already gone still reports success.
pub async fn cleanup_media(
    State(state): State<AppState>,
    Json(request): Json<CleanupRequest>,
) -> ApiResult<Json<CleanupResponse>> {
    let path = resolve_within(&state.work_dir, &request.file_path)?;

    let outcome = remove_scratch_file(&path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to delete {}: {}", path.display(), e)))?;

    let message = match outcome {
        CleanupOutcome::Removed => {
            record_file_cleaned("removed");
            info!(path = %path.display(), "Deleted file");
            "File deleted"
        }
        CleanupOutcome::AlreadyGone => {
            record_file_cleaned("already_gone");
            "File already deleted"
        }
    };

    Ok(Json(CleanupResponse {
        success: true,
        message: Some(message.to_string()),
    }))
}

/// Stream the `video` field to a scratch file in `work_dir`.
async fn save_video_field(work_dir: &Path, multipart: &mut Multipart) -> ApiResult<ScratchFile> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(upload_extension)
            .unwrap_or_else(|| "mp4".to_string());

        tokio::fs::create_dir_all(work_dir).await.map_err(io_error)?;
        let upload = ScratchFile::new(unique_scratch_path(work_dir, "upload", &extension));
        let mut file = tokio::fs::File::create(upload.path())
            .await
            .map_err(io_error)?;

        let mut written = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(format!("upload interrupted: {}", e)))?
        {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        if written == 0 {
            return Err(ApiError::bad_request("uploaded video is empty"));
        }

        info!(path = %upload.path().display(), bytes = written, "Saved uploaded video");
        return Ok(upload);
    }

    Err(ApiError::bad_request(format!(
        "missing multipart field `{}`",
        VIDEO_FIELD
    )))
}

/// Extension of an uploaded file name, if it is a plain alphanumeric one.
fn upload_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

fn io_error(e: std::io::Error) -> ApiError {
    ApiError::internal(format!("failed to store upload: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("clip.MOV"), Some("mov".to_string()));
        assert_eq!(upload_extension("clip"), None);
        assert_eq!(upload_extension("clip.mp4;rm -rf"), None);
        assert_eq!(upload_extension("../../x.mp4"), Some("mp4".to_string()));
    }
}

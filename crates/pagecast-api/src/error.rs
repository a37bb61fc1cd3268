//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use pagecast_publisher::PublishError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Publish(e) if e.is_cancelled() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Publish(e) => match e {
                PublishError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PublishError::CredentialNotFound(_) => StatusCode::NOT_FOUND,
                PublishError::Graph(_) => StatusCode::BAD_GATEWAY,
                PublishError::Transcode(_)
                | PublishError::CredentialStore(_)
                | PublishError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Publish(PublishError::InvalidRequest(_)) => Some("invalid_request"),
            ApiError::Publish(PublishError::CredentialNotFound(_)) => Some("credential_not_found"),
            ApiError::Publish(PublishError::Transcode(_)) => Some("transcode_failed"),
            ApiError::Publish(PublishError::Graph(_)) => Some("graph_error"),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecast_graph::GraphError;
    use pagecast_media::{MediaError, TranscodeReason};
    use pagecast_models::RequestError;

    #[test]
    fn test_publish_error_status_codes() {
        let invalid: ApiError = PublishError::from(RequestError::NoDestinations).into();
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing: ApiError = PublishError::CredentialNotFound("page-1".into()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let transcode: ApiError =
            PublishError::from(MediaError::transcode(TranscodeReason::EncodeFailed, "exit 1")).into();
        assert_eq!(transcode.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: ApiError = PublishError::from(GraphError::request(Some(400), "bad")).into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let cancelled: ApiError = PublishError::from(GraphError::Cancelled).into();
        assert_eq!(cancelled.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_codes() {
        let missing: ApiError = PublishError::CredentialNotFound("page-1".into()).into();
        assert_eq!(missing.code(), Some("credential_not_found"));
        assert_eq!(ApiError::bad_request("x").code(), None);
    }
}

//! Graph API wire types.
//!
//! Responses are parsed per upload phase into typed values. Required fields
//! are checked explicitly so a malformed body becomes the error of the phase
//! that produced it instead of a missing value further down.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pagecast_models::ContentKind;

use crate::error::{GraphError, GraphResult};

/// Page access token. Never printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Which resumable upload flow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Video,
    Reel,
}

impl UploadKind {
    /// Edge under the destination node.
    pub fn edge(&self) -> &'static str {
        match self {
            Self::Video => "videos",
            Self::Reel => "video_reels",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Reel => "reel",
        }
    }
}

impl TryFrom<ContentKind> for UploadKind {
    type Error = GraphError;

    fn try_from(kind: ContentKind) -> GraphResult<Self> {
        match kind {
            ContentKind::Video => Ok(Self::Video),
            ContentKind::Reel => Ok(Self::Reel),
            other => Err(GraphError::InvalidPayload(format!(
                "{} content does not use the resumable upload flow",
                other.as_str()
            ))),
        }
    }
}

/// Read a string field, accepting numeric ids.
fn id_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull `error.message` out of a Graph error body, falling back to the raw text.
pub fn graph_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Start-phase response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartResponse {
    /// Remote asset id
    pub video_id: String,
    /// Session id for the finish call; the asset id when not reported
    pub upload_session_id: String,
    /// Where chunks are sent
    pub upload_url: String,
}

impl StartResponse {
    pub fn parse(body: &Value) -> GraphResult<Self> {
        let video_id = id_field(body, "video_id")
            .ok_or_else(|| GraphError::upload_start(None, "response has no video_id"))?;

        let upload_url = id_field(body, "upload_url")
            .ok_or_else(|| GraphError::upload_start(None, "response has no upload_url"))?;
        url::Url::parse(&upload_url).map_err(|e| {
            GraphError::upload_start(None, format!("upload_url {:?} is not a URL: {}", upload_url, e))
        })?;

        let upload_session_id = id_field(body, "upload_session_id").unwrap_or_else(|| video_id.clone());

        Ok(Self {
            video_id,
            upload_session_id,
            upload_url,
        })
    }
}

/// Transfer-phase acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferAck {
    /// Next offset reported by the server, if any
    pub next_offset: Option<u64>,
}

impl TransferAck {
    /// Parse the `Offset` response header. Anything but plain digits is ignored.
    pub fn from_header(value: Option<&str>) -> Self {
        let next_offset = value
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse().ok());
        Self { next_offset }
    }
}

/// Finish-phase response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishResponse {
    pub success: bool,
    /// Full response body
    pub raw: Value,
}

impl FinishResponse {
    pub fn parse(body: Value) -> GraphResult<Self> {
        if let Some(message) = body
            .get("error")
            .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
        {
            return Err(GraphError::upload_finish(None, message));
        }

        // A body without a success flag is accepted as long as the request succeeded
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
        if !success {
            return Err(GraphError::upload_finish(None, "platform returned success=false"));
        }

        Ok(Self { success, raw: body })
    }
}

/// `status.uploading_phase.status` as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum UploadPhaseStatus {
    Ready,
    Error,
    /// Any other reported value, including `in_progress`
    Pending(String),
    /// The field was absent
    Unknown,
}

impl UploadPhaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Pending(s) => s,
            Self::Unknown => "unknown",
        }
    }
}

/// Status-phase response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoStatus {
    pub uploading_phase: UploadPhaseStatus,
    /// The `status` object as returned
    pub raw: Value,
}

impl VideoStatus {
    pub fn parse(body: &Value) -> Self {
        let status = body.get("status").cloned().unwrap_or(Value::Null);
        let phase = status
            .get("uploading_phase")
            .and_then(|p| p.get("status"))
            .and_then(Value::as_str);

        let uploading_phase = match phase {
            Some("ready") => UploadPhaseStatus::Ready,
            Some("error") => UploadPhaseStatus::Error,
            Some(other) => UploadPhaseStatus::Pending(other.to_string()),
            None => UploadPhaseStatus::Unknown,
        };

        Self {
            uploading_phase,
            raw: status,
        }
    }

    /// Best-effort error detail from the status object.
    pub fn error_detail(&self) -> String {
        self.raw
            .get("uploading_phase")
            .and_then(|p| p.get("errors"))
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "upload processing failed".to_string())
    }
}

/// Response of a feed or photo post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub id: String,
}

impl PostResponse {
    pub fn parse(body: &Value) -> GraphResult<Self> {
        // Photo posts report both `id` and `post_id`; the post id is the published one
        let id = id_field(body, "post_id")
            .or_else(|| id_field(body, "id"))
            .ok_or_else(|| GraphError::invalid_response("post response has no id"))?;
        Ok(Self { id })
    }
}

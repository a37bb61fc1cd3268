//! Publish request model and validation.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Identifier of a target page/channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DestinationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DestinationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of post being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Reel,
}

impl ContentKind {
    /// Whether this kind goes through the resumable upload session.
    pub fn is_video(&self) -> bool {
        matches!(self, ContentKind::Video | ContentKind::Reel)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Reel => "reel",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the media for a post comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MediaSource {
    /// Local file that still needs the normalization pass.
    RawFile { path: PathBuf },
    /// Local file already produced by the transcoder.
    PreparedFile { path: PathBuf },
    /// Publicly reachable URL (images only).
    RemoteUrl { url: Url },
}

impl MediaSource {
    /// Local path, if the media lives on disk.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            MediaSource::RawFile { path } | MediaSource::PreparedFile { path } => Some(path),
            MediaSource::RemoteUrl { .. } => None,
        }
    }
}

/// Errors that reject a request before any network call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("At least one destination is required")]
    NoDestinations,

    #[error("Destination identifier must not be empty")]
    EmptyDestination,

    #[error("Scheduled time {scheduled_at} is not in the future (now: {now})")]
    ScheduleInPast {
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("{0} posts require media")]
    MissingMedia(ContentKind),

    #[error("Unsupported media for {kind} posts: {reason}")]
    UnsupportedMedia { kind: ContentKind, reason: String },

    #[error("Caption is required for {0} posts")]
    MissingCaption(ContentKind),
}

/// One publish request fanned out to several destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Pages to publish to, processed in order
    pub destinations: Vec<DestinationId>,
    pub kind: ContentKind,
    #[serde(default)]
    pub media: Option<MediaSource>,
    /// Caption, description or feed message depending on kind
    #[serde(default)]
    pub caption: Option<String>,
    /// Publish time; posts are created unpublished-scheduled when set
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Poll the platform until the uploaded video is ready
    #[serde(default)]
    pub wait_until_ready: bool,
    /// Delete the local media file once the batch is done
    #[serde(default)]
    pub discard_media_after: bool,
}

impl UploadRequest {
    /// Create a request with no media, caption or schedule.
    pub fn new(kind: ContentKind, destinations: Vec<DestinationId>) -> Self {
        Self {
            destinations,
            kind,
            media: None,
            caption: None,
            scheduled_at: None,
            wait_until_ready: false,
            discard_media_after: false,
        }
    }

    pub fn with_media(mut self, media: MediaSource) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_schedule(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Caption with surrounding whitespace removed, `None` when blank.
    pub fn caption(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Whether the media must be transcoded before upload.
    pub fn needs_transcode(&self) -> bool {
        self.kind.is_video() && matches!(self.media, Some(MediaSource::RawFile { .. }))
    }

    /// Validate the request against the current time.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), RequestError> {
        if self.destinations.is_empty() {
            return Err(RequestError::NoDestinations);
        }
        if self.destinations.iter().any(|d| d.as_str().trim().is_empty()) {
            return Err(RequestError::EmptyDestination);
        }

        if let Some(scheduled_at) = self.scheduled_at {
            if scheduled_at <= now {
                return Err(RequestError::ScheduleInPast { scheduled_at, now });
            }
        }

        match (self.kind, &self.media) {
            (ContentKind::Text, None) => {
                if self.caption().is_none() {
                    return Err(RequestError::MissingCaption(self.kind));
                }
            }
            (ContentKind::Text, Some(_)) => {
                return Err(RequestError::UnsupportedMedia {
                    kind: self.kind,
                    reason: "text posts carry no media".to_string(),
                });
            }
            (_, None) => return Err(RequestError::MissingMedia(self.kind)),
            (ContentKind::Image, Some(_)) => {}
            (ContentKind::Video | ContentKind::Reel, Some(MediaSource::RemoteUrl { .. })) => {
                return Err(RequestError::UnsupportedMedia {
                    kind: self.kind,
                    reason: "video must be uploaded from a local file".to_string(),
                });
            }
            (ContentKind::Video | ContentKind::Reel, Some(_)) => {}
        }

        if self.kind == ContentKind::Reel && self.caption().is_none() {
            return Err(RequestError::MissingCaption(self.kind));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reel(path: &str) -> UploadRequest {
        UploadRequest::new(ContentKind::Reel, vec!["page-1".into()])
            .with_media(MediaSource::RawFile { path: path.into() })
            .with_caption("hello")
    }

    #[test]
    fn test_valid_reel() {
        assert_eq!(reel("/tmp/in.mp4").validate(Utc::now()), Ok(()));
        assert!(reel("/tmp/in.mp4").needs_transcode());
    }

    #[test]
    fn test_past_schedule_rejected() {
        let now = Utc::now();
        let request = reel("/tmp/in.mp4").with_schedule(now - Duration::minutes(1));
        assert!(matches!(
            request.validate(now),
            Err(RequestError::ScheduleInPast { .. })
        ));

        // Exactly "now" is not strictly in the future either.
        let request = reel("/tmp/in.mp4").with_schedule(now);
        assert!(request.validate(now).is_err());

        let request = reel("/tmp/in.mp4").with_schedule(now + Duration::hours(1));
        assert!(request.validate(now).is_ok());
    }

    #[test]
    fn test_video_from_url_rejected() {
        let request = UploadRequest::new(ContentKind::Video, vec!["p".into()]).with_media(
            MediaSource::RemoteUrl {
                url: Url::parse("https://example.com/a.mp4").unwrap(),
            },
        );
        assert!(matches!(
            request.validate(Utc::now()),
            Err(RequestError::UnsupportedMedia { .. })
        ));
    }

    #[test]
    fn test_reel_requires_caption() {
        let mut request = reel("/tmp/in.mp4");
        request.caption = Some("   ".to_string());
        assert_eq!(
            request.validate(Utc::now()),
            Err(RequestError::MissingCaption(ContentKind::Reel))
        );
    }

    #[test]
    fn test_text_rules() {
        let text = UploadRequest::new(ContentKind::Text, vec!["p".into()]);
        assert!(text.validate(Utc::now()).is_err());
        assert!(text.clone().with_caption("hi").validate(Utc::now()).is_ok());
        assert!(text.validate(Utc::now()).is_err());
    }

    #[test]
    fn test_no_destinations() {
        let request = UploadRequest::new(ContentKind::Text, vec![]).with_caption("hi");
        assert_eq!(request.validate(Utc::now()), Err(RequestError::NoDestinations));
    }

    #[test]
    fn test_prepared_file_skips_transcode() {
        let request = UploadRequest::new(ContentKind::Video, vec!["p".into()]).with_media(
            MediaSource::PreparedFile {
                path: "/tmp/processed.mp4".into(),
            },
        );
        assert!(!request.needs_transcode());
        assert!(request.validate(Utc::now()).is_ok());
    }

    #[test]
    fn test_deserialize_request() {
        let json = r#"{
            "destinations": ["123", "456"],
            "kind": "reel",
            "media": {"source": "raw_file", "path": "/tmp/a.mp4"},
            "caption": "launch day"
        }"#;
        let request: UploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.destinations.len(), 2);
        assert_eq!(request.kind, ContentKind::Reel);
        assert!(request.needs_transcode());
        assert!(!request.wait_until_ready);
    }
}

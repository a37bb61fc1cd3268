//! Encoding profile for uploaded video.

use serde::{Deserialize, Serialize};

/// Output width for vertical video.
pub const TARGET_WIDTH: u32 = 1080;
/// Output height for vertical video.
pub const TARGET_HEIGHT: u32 = 1920;
/// Target aspect ratio numerator (9:16).
pub const TARGET_ASPECT_NUM: u32 = 9;
/// Target aspect ratio denominator (9:16).
pub const TARGET_ASPECT_DEN: u32 = 16;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Fixed output frame rate
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Closed GOP length in frames
pub const DEFAULT_GOP_SIZE: u32 = 60;
/// Audio sample rate in Hz
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Audio channel count
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;

/// Normalized codec/container profile applied before upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeProfile {
    /// Output width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Keyframe interval; also used as the minimum so every GOP is the same length
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    #[serde(default = "default_audio_channels")]
    pub audio_channels: u8,
}

fn default_width() -> u32 {
    TARGET_WIDTH
}
fn default_height() -> u32 {
    TARGET_HEIGHT
}
fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}
fn default_gop_size() -> u32 {
    DEFAULT_GOP_SIZE
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_audio_sample_rate() -> u32 {
    DEFAULT_AUDIO_SAMPLE_RATE
}
fn default_audio_channels() -> u8 {
    DEFAULT_AUDIO_CHANNELS
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            width: TARGET_WIDTH,
            height: TARGET_HEIGHT,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            frame_rate: DEFAULT_FRAME_RATE,
            gop_size: DEFAULT_GOP_SIZE,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            audio_channels: DEFAULT_AUDIO_CHANNELS,
        }
    }
}

impl TranscodeProfile {
    /// Profile for vertical Reels and page videos.
    pub fn vertical() -> Self {
        Self::default()
    }

    /// Returns a new profile with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// `scale` filter for the target resolution.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }

    /// Convert to FFmpeg output arguments (everything except the filter chain).
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-g".to_string(),
            self.gop_size.to_string(),
            "-keyint_min".to_string(),
            self.gop_size.to_string(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.audio_sample_rate.to_string(),
            "-ac".to_string(),
            self.audio_channels.to_string(),
            "-max_muxing_queue_size".to_string(),
            "1024".to_string(),
        ]
    }
}

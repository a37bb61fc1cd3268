use serde::{Deserialize, Serialize};

/// A pixel rectangle inside a source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// X coordinate of the top-left corner
    pub x: u32,
    /// Y coordinate of the top-left corner
    pub y: u32,
    /// Width of the rectangle
    pub width: u32,
    /// Height of the rectangle
    pub height: u32,
}

impl CropRect {
    /// Create a new crop rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Check that the rectangle is non-empty and lies inside a `width`×`height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    /// FFmpeg `crop` filter expression (`crop=w:h:x:y`).
    pub fn to_ffmpeg_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within() {
        assert!(CropRect::new(656, 0, 608, 1080).fits_within(1920, 1080));
        assert!(!CropRect::new(1400, 0, 608, 1080).fits_within(1920, 1080));
        assert!(!CropRect::new(0, 0, 0, 1080).fits_within(1920, 1080));
    }

    #[test]
    fn test_ffmpeg_filter() {
        let rect = CropRect::new(656, 0, 608, 1080);
        assert_eq!(rect.to_ffmpeg_filter(), "crop=608:1080:656:0");
    }
}

//! Centered crop computation for vertical output.

use pagecast_models::encoding::{TARGET_ASPECT_DEN, TARGET_ASPECT_NUM};
use pagecast_models::CropRect;

/// Integer division rounding halves up.
fn round_div(n: u64, d: u64) -> u64 {
    (2 * n + d) / (2 * d)
}

/// Compute the centered crop that turns a `width`×`height` frame into 9:16.
///
/// Too-wide frames keep their full height, too-tall frames keep their full
/// width, and frames already at 9:16 are left untouched. Returns `None` for
/// empty frames.
pub fn compute_centered_crop(width: u32, height: u32) -> Option<CropRect> {
    compute_crop_for_aspect(width, height, TARGET_ASPECT_NUM, TARGET_ASPECT_DEN)
}

/// Compute the centered crop for an arbitrary `num:den` aspect ratio.
pub fn compute_crop_for_aspect(width: u32, height: u32, num: u32, den: u32) -> Option<CropRect> {
    if width == 0 || height == 0 || num == 0 || den == 0 {
        return None;
    }

    let (w, h) = (width as u64, height as u64);
    let (num, den) = (num as u64, den as u64);

    // Cross-multiplied comparison of width/height against num/den
    let rect = match (w * den).cmp(&(h * num)) {
        std::cmp::Ordering::Greater => {
            let crop_width = round_div(h * num, den).clamp(1, w);
            let x = round_div(w - crop_width, 2);
            CropRect::new(x as u32, 0, crop_width as u32, height)
        }
        std::cmp::Ordering::Less => {
            let crop_height = round_div(w * den, num).clamp(1, h);
            let y = round_div(h - crop_height, 2);
            CropRect::new(0, y as u32, width, crop_height as u32)
        }
        std::cmp::Ordering::Equal => CropRect::full_frame(width, height),
    };

    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: f64 = 9.0 / 16.0;

    #[test]
    fn test_landscape_1080p() {
        let rect = compute_centered_crop(1920, 1080).unwrap();
        assert_eq!(rect, CropRect::new(656, 0, 608, 1080));
    }

    #[test]
    fn test_already_vertical() {
        let rect = compute_centered_crop(1080, 1920).unwrap();
        assert_eq!(rect, CropRect::full_frame(1080, 1920));
    }

    #[test]
    fn test_too_tall() {
        // 1080x2400 (9:20) keeps full width, trims top and bottom
        let rect = compute_centered_crop(1080, 2400).unwrap();
        assert_eq!(rect.width, 1080);
        assert_eq!(rect.height, 1920);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 240);
    }

    #[test]
    fn test_square() {
        let rect = compute_centered_crop(1000, 1000).unwrap();
        // round(1000 * 9 / 16) = round(562.5) = 563
        assert_eq!(rect.width, 563);
        assert_eq!(rect.height, 1000);
        // round((1000 - 563) / 2) = round(218.5) = 219
        assert_eq!(rect.x, 219);
    }

    #[test]
    fn test_empty_frame() {
        assert!(compute_centered_crop(0, 1080).is_none());
        assert!(compute_centered_crop(1920, 0).is_none());
    }

    #[test]
    fn test_crop_always_contained_and_on_target_aspect() {
        let sizes = [1u32, 2, 3, 7, 16, 33, 100, 240, 360, 480, 607, 720, 1080, 1280, 1920, 2160, 3840, 4096];
        for &width in &sizes {
            for &height in &sizes {
                let rect = compute_centered_crop(width, height).unwrap();
                assert!(
                    rect.fits_within(width, height),
                    "{:?} escapes {}x{}",
                    rect,
                    width,
                    height
                );

                // Rounding one side by at most half a pixel bounds the ratio error
                let tolerance = 0.5 / rect.height as f64 + 0.5 / rect.width as f64 + 1e-9;
                let is_identity = rect == CropRect::full_frame(width, height);
                if !is_identity && rect.width > 1 && rect.height > 1 {
                    assert!(
                        (rect.aspect_ratio() - TARGET).abs() <= tolerance,
                        "{}x{} -> {:?} ratio {}",
                        width,
                        height,
                        rect,
                        rect.aspect_ratio()
                    );
                }

                // Centered within a pixel
                let left = rect.x as i64;
                let right = width as i64 - (rect.x + rect.width) as i64;
                let top = rect.y as i64;
                let bottom = height as i64 - (rect.y + rect.height) as i64;
                assert!((left - right).abs() <= 1);
                assert!((top - bottom).abs() <= 1);
            }
        }
    }
}

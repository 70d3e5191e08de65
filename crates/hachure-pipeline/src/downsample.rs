//! Working-copy downsampling for color sampling.
//!
//! Clustering only needs a representative subset of pixel colors, so the
//! sampler draws from a reduced copy whose longest axis matches the
//! configured working resolution. Full-resolution labeling always uses
//! the original image.
//!
//! If the image is already at or below the target resolution, it is
//! borrowed unchanged.

use std::borrow::Cow;
use std::fmt;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Resampling filter used when downsampling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality,
/// with a `Disabled` variant to skip downsampling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Skip downsampling regardless of image size.
    Disabled,
    /// Nearest-neighbor: fastest, never invents colors.
    #[default]
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    ///
    /// Returns `None` for [`DownsampleFilter::Disabled`] since there is
    /// no corresponding resampling filter.
    const fn to_image_filter(self) -> Option<image::imageops::FilterType> {
        match self {
            Self::Disabled => None,
            Self::Nearest => Some(image::imageops::FilterType::Nearest),
            Self::Triangle => Some(image::imageops::FilterType::Triangle),
            Self::CatmullRom => Some(image::imageops::FilterType::CatmullRom),
            Self::Gaussian => Some(image::imageops::FilterType::Gaussian),
            Self::Lanczos3 => Some(image::imageops::FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Target size for an image whose longest axis must become
/// `max_dimension`, preserving aspect ratio (each axis at least 1 px).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn target_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scale = f64::from(max_dimension) / f64::from(width.max(height));
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Downsample an image so the longest axis is at most `max_dimension`
/// pixels, using the specified resampling filter.
///
/// Returns the (possibly borrowed) working image and whether
/// downsampling was actually applied. A `max_dimension` of zero
/// disables downsampling.
#[must_use]
pub fn downsample(
    image: &RgbaImage,
    max_dimension: u32,
    filter: DownsampleFilter,
) -> (Cow<'_, RgbaImage>, bool) {
    let Some(image_filter) = filter.to_image_filter() else {
        return (Cow::Borrowed(image), false);
    };

    let (w, h) = image.dimensions();
    if max_dimension == 0 || w.max(h) <= max_dimension {
        return (Cow::Borrowed(image), false);
    }

    let (tw, th) = target_size(w, h, max_dimension);
    let resized = image::imageops::resize(image, tw, th, image_filter);
    (Cow::Owned(resized), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn default_filter_is_nearest() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Nearest);
    }

    #[test]
    fn no_downsample_when_already_small() {
        let img = test_image(100, 80);
        let (result, applied) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert!(!applied);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.dimensions(), (100, 80));
    }

    #[test]
    fn no_downsample_when_exact_match() {
        let img = test_image(256, 200);
        let (result, applied) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert!(!applied);
        assert_eq!(result.dimensions(), (256, 200));
    }

    #[test]
    fn downsample_landscape() {
        let img = test_image(1024, 768);
        let (result, applied) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert!(applied);
        // Aspect ratio preserved: 768 * 256 / 1024 = 192
        assert_eq!(result.dimensions(), (256, 192));
    }

    #[test]
    fn downsample_portrait() {
        let img = test_image(600, 1200);
        let (result, applied) = downsample(&img, 256, DownsampleFilter::Nearest);
        assert!(applied);
        assert_eq!(result.dimensions(), (128, 256));
    }

    #[test]
    fn nearest_preserves_palette() {
        // Two-color checkerboard: nearest-neighbor must not blend.
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        let (result, applied) = downsample(&img, 16, DownsampleFilter::Nearest);
        assert!(applied);
        for p in result.pixels() {
            assert!(p.0 == [255, 0, 0, 255] || p.0 == [0, 0, 255, 255]);
        }
    }

    #[test]
    fn disabled_filter_skips_even_large_image() {
        let img = test_image(1024, 768);
        let (result, applied) = downsample(&img, 256, DownsampleFilter::Disabled);
        assert!(!applied);
        assert_eq!(result.dimensions(), (1024, 768));
    }

    #[test]
    fn zero_resolution_disables_downsampling() {
        let img = test_image(300, 300);
        let (_, applied) = downsample(&img, 0, DownsampleFilter::Nearest);
        assert!(!applied);
    }
}

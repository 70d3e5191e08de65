//! Shared types for the hachure color-separation pipeline.

use serde::{Deserialize, Serialize};

use crate::downsample::DownsampleFilter;
use crate::hatch::HatchParams;
use crate::morphology::MorphologyKind;
use crate::quantize::KMeansOptions;

/// Re-export `GrayImage` so downstream crates can reference layer
/// masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded source image without depending on `image` directly.
pub use image::RgbaImage;

/// Millimetres per inch, the basis for every physical unit conversion.
pub const MM_PER_INCH: f64 = 25.4;

/// Pixel density assumed when the source image carries no usable
/// density metadata.
pub const DEFAULT_PPI: f64 = 300.0;

/// An 8-bit RGB color as sampled from the source image.
pub type Rgb = [u8; 3];

/// A cluster center in RGB space (floating point during computation).
pub type Center = [f64; 3];

/// Round a floating cluster center to the nearest 8-bit color.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn center_to_rgb(center: Center) -> Rgb {
    center.map(|c| c.round().clamp(0.0, 255.0) as u8)
}

/// Convert a length in millimetres to pixels at the given density.
#[must_use]
pub fn mm_to_px(mm: f64, ppi: f64) -> f64 {
    mm / MM_PER_INCH * ppi
}

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One straight hatch stroke in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First inside sample of the run.
    pub start: Point,
    /// Last inside sample of the run.
    pub end: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Length of the stroke in pixels.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Unit in which the blank border around exported documents is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BorderUnit {
    /// Border size in inches.
    #[default]
    Inches,
    /// Border size in millimetres.
    Millimeters,
}

/// Optional uniform blank border added on every side of exported
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Border {
    /// Whether the border is applied at all.
    pub enabled: bool,
    /// Border size in [`unit`](Self::unit)s. Negative values count as zero.
    pub size: f64,
    /// Unit of [`size`](Self::size).
    pub unit: BorderUnit,
}

impl Border {
    /// Border width in pixels at the given density (zero when disabled).
    #[must_use]
    pub fn to_px(&self, ppi: f64) -> f64 {
        if !self.enabled || !self.size.is_finite() {
            return 0.0;
        }
        let size = self.size.max(0.0);
        match self.unit {
            BorderUnit::Inches => size * ppi,
            BorderUnit::Millimeters => mm_to_px(size, ppi),
        }
    }
}

/// Hatch and export parameters, in physical units.
///
/// The session treats a value of this struct as an immutable snapshot;
/// replacing it through [`Session::set_settings`](crate::Session::set_settings)
/// invalidates cached segments when a hatch-affecting field changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HatchSettings {
    /// Hatch line angle in degrees (0 = horizontal, clockwise in image space).
    pub angle: f64,
    /// Distance between parallel hatch lines in millimetres.
    pub spacing_mm: f64,
    /// Whether a second pass at [`cross_angle`](Self::cross_angle) is drawn.
    pub cross_hatch: bool,
    /// Angle of the cross-hatch pass in degrees.
    pub cross_angle: f64,
    /// Stroke width in millimetres.
    pub stroke_mm: f64,
    /// Hatch everything *except* each layer's color.
    pub invert: bool,
    /// Blank border around exported documents.
    pub border: Border,
    /// Global morphological opening radius in pixels (0 = none).
    /// Individual layers may override it.
    pub erosion_radius: u32,
}

impl HatchSettings {
    /// Default hatch angle in degrees.
    pub const DEFAULT_ANGLE: f64 = 45.0;
    /// Default line spacing in millimetres.
    pub const DEFAULT_SPACING_MM: f64 = 1.0;
    /// Default cross-hatch angle in degrees.
    pub const DEFAULT_CROSS_ANGLE: f64 = 135.0;
    /// Default stroke width in millimetres.
    pub const DEFAULT_STROKE_MM: f64 = 0.3;
    /// Default global erosion radius in pixels.
    pub const DEFAULT_EROSION_RADIUS: u32 = 0;

    /// Line spacing converted to pixels.
    #[must_use]
    pub fn spacing_px(&self, ppi: f64) -> f64 {
        mm_to_px(self.spacing_mm, ppi)
    }

    /// Stroke width converted to pixels.
    #[must_use]
    pub fn stroke_px(&self, ppi: f64) -> f64 {
        mm_to_px(self.stroke_mm, ppi)
    }

    /// Border converted to pixels.
    #[must_use]
    pub fn border_px(&self, ppi: f64) -> f64 {
        self.border.to_px(ppi)
    }

    /// Pixel-space parameters for the hatch engine.
    #[must_use]
    pub fn hatch_params(&self, ppi: f64) -> HatchParams {
        HatchParams {
            angle: self.angle,
            spacing: self.spacing_px(ppi),
            cross_hatch: self.cross_hatch,
            cross_angle: self.cross_angle,
        }
    }

    /// Whether switching from `self` to `other` changes any hatch output.
    ///
    /// The border only affects document framing, never the segments.
    #[must_use]
    pub fn affects_segments(&self, other: &Self) -> bool {
        Self {
            border: other.border,
            ..*self
        } != *other
    }
}

impl Default for HatchSettings {
    fn default() -> Self {
        Self {
            angle: Self::DEFAULT_ANGLE,
            spacing_mm: Self::DEFAULT_SPACING_MM,
            cross_hatch: false,
            cross_angle: Self::DEFAULT_CROSS_ANGLE,
            stroke_mm: Self::DEFAULT_STROKE_MM,
            invert: false,
            border: Border::default(),
            erosion_radius: Self::DEFAULT_EROSION_RADIUS,
        }
    }
}

/// Configuration for a color analysis (clustering) run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Requested cluster count. Zero or negative selects `k`
    /// automatically from the number of distinct sampled colors;
    /// positive values are clamped to `[2, 12]`.
    pub requested_k: i32,

    /// Lloyd iteration cap and convergence tolerance.
    pub kmeans: KMeansOptions,

    /// Maximum number of pixels sampled for clustering.
    pub max_samples: usize,

    /// Longest axis of the working copy the samples are drawn from.
    pub working_resolution: u32,

    /// Resampling filter used to build the working copy.
    pub downsample_filter: DownsampleFilter,

    /// Seed for the sampling and k-means++ random source. `None` seeds
    /// from the operating system.
    pub seed: Option<u64>,

    /// Morphology backend used for the erosion (opening) step.
    pub morphology: MorphologyKind,
}

impl AnalysisConfig {
    /// Default requested cluster count (automatic).
    pub const DEFAULT_REQUESTED_K: i32 = 0;
    /// Default sample cap.
    pub const DEFAULT_MAX_SAMPLES: usize = 200_000;
    /// Default working resolution for sampling.
    pub const DEFAULT_WORKING_RESOLUTION: u32 = 1024;
    /// Default downsample filter. Nearest-neighbor never blends colors,
    /// so the sampled palette matches the source image.
    pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Nearest;
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            requested_k: Self::DEFAULT_REQUESTED_K,
            kmeans: KMeansOptions::default(),
            max_samples: Self::DEFAULT_MAX_SAMPLES,
            working_resolution: Self::DEFAULT_WORKING_RESOLUTION,
            downsample_filter: Self::DEFAULT_DOWNSAMPLE_FILTER,
            seed: None,
            morphology: MorphologyKind::default(),
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Input reached an algorithm in a state it cannot process
    /// (e.g. an empty pixel sample reaching the quantizer).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A layer operation was requested before any analysis completed.
    #[error("no analysis has been run yet")]
    NotAnalyzed,

    /// A layer index outside the current center set was requested.
    #[error("layer {layer} is out of range ({count} layers)")]
    LayerOutOfRange {
        /// Requested zero-based layer index.
        layer: usize,
        /// Number of layers in the current analysis.
        count: usize,
    },
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidInput(String),
    InvalidConfig(String),
    NotAnalyzed,
    LayerOutOfRange { layer: usize, count: usize },
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidInput(s) => PipelineErrorProxy::InvalidInput(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
            Self::NotAnalyzed => PipelineErrorProxy::NotAnalyzed,
            Self::LayerOutOfRange { layer, count } => PipelineErrorProxy::LayerOutOfRange {
                layer: *layer,
                count: *count,
            },
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The original image::ImageError cannot be reconstructed;
            // keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidInput(s) => Self::InvalidInput(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
            PipelineErrorProxy::NotAnalyzed => Self::NotAnalyzed,
            PipelineErrorProxy::LayerOutOfRange { layer, count } => {
                Self::LayerOutOfRange { layer, count }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point / Segment ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn segment_length() {
        let s = Segment::new(Point::new(1.0, 1.0), Point::new(4.0, 5.0));
        assert!((s.length() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.pixel_count(), 307_200);
    }

    // --- Unit conversion ---

    #[test]
    fn mm_to_px_at_300_ppi() {
        // 25.4 mm is exactly one inch.
        assert!((mm_to_px(25.4, 300.0) - 300.0).abs() < 1e-9);
        assert!((mm_to_px(1.0, 254.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn center_to_rgb_rounds_and_clamps() {
        assert_eq!(center_to_rgb([0.4, 127.5, 300.0]), [0, 128, 255]);
        assert_eq!(center_to_rgb([-3.0, 254.6, 10.49]), [0, 255, 10]);
    }

    #[test]
    fn border_disabled_is_zero() {
        let border = Border {
            enabled: false,
            size: 1.0,
            unit: BorderUnit::Inches,
        };
        assert!(border.to_px(300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn border_units_convert() {
        let inches = Border {
            enabled: true,
            size: 0.5,
            unit: BorderUnit::Inches,
        };
        assert!((inches.to_px(300.0) - 150.0).abs() < 1e-9);

        let mm = Border {
            enabled: true,
            size: 25.4,
            unit: BorderUnit::Millimeters,
        };
        assert!((mm.to_px(200.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn negative_border_counts_as_zero() {
        let border = Border {
            enabled: true,
            size: -2.0,
            unit: BorderUnit::Millimeters,
        };
        assert!(border.to_px(300.0).abs() < f64::EPSILON);
    }

    // --- HatchSettings ---

    #[test]
    fn hatch_params_are_in_pixels() {
        let settings = HatchSettings {
            angle: 30.0,
            spacing_mm: 2.54,
            cross_hatch: true,
            cross_angle: 120.0,
            ..HatchSettings::default()
        };
        let params = settings.hatch_params(100.0);
        assert!((params.spacing - 10.0).abs() < 1e-9);
        assert!((params.angle - 30.0).abs() < f64::EPSILON);
        assert!(params.cross_hatch);
        assert!((params.cross_angle - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn border_change_does_not_affect_segments() {
        let a = HatchSettings::default();
        let b = HatchSettings {
            border: Border {
                enabled: true,
                size: 3.0,
                unit: BorderUnit::Millimeters,
            },
            ..a
        };
        assert!(!a.affects_segments(&b));
    }

    #[test]
    fn hatch_field_changes_affect_segments() {
        let a = HatchSettings::default();
        for b in [
            HatchSettings { angle: 10.0, ..a },
            HatchSettings {
                spacing_mm: 2.0,
                ..a
            },
            HatchSettings {
                cross_hatch: true,
                ..a
            },
            HatchSettings {
                cross_angle: 0.0,
                ..a
            },
            HatchSettings {
                stroke_mm: 0.8,
                ..a
            },
            HatchSettings { invert: true, ..a },
            HatchSettings {
                erosion_radius: 2,
                ..a
            },
        ] {
            assert!(a.affects_segments(&b), "expected change for {b:?}");
        }
    }

    // --- Errors ---

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            PipelineError::InvalidInput("empty sample".to_string()).to_string(),
            "invalid input: empty sample",
        );
        assert_eq!(
            PipelineError::LayerOutOfRange { layer: 7, count: 3 }.to_string(),
            "layer 7 is out of range (3 layers)",
        );
    }

    // --- Serde ---

    #[test]
    fn hatch_settings_serde_round_trip() {
        let settings = HatchSettings {
            angle: 15.0,
            spacing_mm: 0.7,
            cross_hatch: true,
            cross_angle: 105.0,
            stroke_mm: 0.25,
            invert: true,
            border: Border {
                enabled: true,
                size: 5.0,
                unit: BorderUnit::Millimeters,
            },
            erosion_radius: 3,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: HatchSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn analysis_config_serde_round_trip() {
        let config = AnalysisConfig {
            requested_k: 6,
            seed: Some(42),
            ..AnalysisConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::LayerOutOfRange { layer: 4, count: 2 };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            PipelineError::LayerOutOfRange { layer: 4, count: 2 }
        ));

        let err = PipelineError::InvalidInput("empty".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, PipelineError::InvalidInput(ref s) if s == "empty"));
    }
}

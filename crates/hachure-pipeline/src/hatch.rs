//! Hatch fill: parallel line strokes across a raster mask.
//!
//! Each pass sweeps lines at a fixed angle over the whole mask. A line is
//! walked in 1 px steps; every maximal run of samples that land on set
//! mask pixels becomes one [`Segment`] running from the first to the last
//! inside sample. Cross-hatching appends a second pass at another angle
//! without merging the two.
//!
//! Spacing is in pixels; the physical-unit conversion happens in
//! [`HatchSettings::hatch_params`](crate::HatchSettings::hatch_params).

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::mask::is_set;
use crate::types::{Point, Segment};

/// Smallest line spacing in pixels a pass accepts.
pub const MIN_SPACING_PX: f64 = 0.1;

/// Pixel-space hatch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HatchParams {
    /// Primary line angle in degrees.
    pub angle: f64,
    /// Distance between adjacent lines in pixels.
    pub spacing: f64,
    /// Whether a second pass at `cross_angle` is added.
    pub cross_hatch: bool,
    /// Second pass angle in degrees.
    pub cross_angle: f64,
}

/// Unit direction of a hatch pass and its normal.
#[derive(Debug, Clone, Copy)]
struct ScanDirection {
    dx: f64,
    dy: f64,
    nx: f64,
    ny: f64,
}

impl ScanDirection {
    fn from_degrees(angle: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self {
            dx: cos,
            dy: sin,
            nx: -sin,
            ny: cos,
        }
    }

    /// Signed offset of `(x, y)` along the normal.
    fn offset(&self, x: f64, y: f64) -> f64 {
        self.nx.mul_add(x, self.ny * y)
    }
}

/// Generate all segments for `params`: the primary pass, followed by
/// the cross pass when enabled.
#[must_use]
pub fn hatch(mask: &GrayImage, params: &HatchParams) -> Vec<Segment> {
    let mut segments = hatch_pass(mask, params.angle, params.spacing);
    if params.cross_hatch {
        segments.extend(hatch_pass(mask, params.cross_angle, params.spacing));
    }
    segments
}

/// One pass of parallel lines at `angle` degrees, `spacing` px apart.
///
/// Returns no segments for an empty mask, or for a spacing that is not
/// finite or is below [`MIN_SPACING_PX`].
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn hatch_pass(mask: &GrayImage, angle: f64, spacing: f64) -> Vec<Segment> {
    if !spacing.is_finite() || spacing < MIN_SPACING_PX || !angle.is_finite() {
        return Vec::new();
    }
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let (w, h) = (f64::from(w), f64::from(h));
    let dir = ScanDirection::from_degrees(angle);

    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    let (c_min, c_max) = corners
        .iter()
        .map(|&(x, y)| dir.offset(x, y))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c), hi.max(c))
        });
    let pad = spacing * 2.0;
    let (c_min, c_max) = (c_min - pad, c_max + pad);

    let (cx, cy) = (w / 2.0, h / 2.0);
    let center_offset = dir.offset(cx, cy);
    let span = w.hypot(h) + 2.0 * pad;
    let half = span / 2.0;
    let steps = span.floor() as usize;
    let lines = ((c_max - c_min) / spacing).floor() as usize;

    let mut segments = Vec::new();
    for i in 0..=lines {
        let c = (i as f64).mul_add(spacing, c_min);
        let shift = c - center_offset;
        let anchor = Point::new(dir.nx.mul_add(shift, cx), dir.ny.mul_add(shift, cy));
        scan_line(mask, anchor, &dir, half, steps, &mut segments);
    }

    tracing::trace!(angle, spacing, segments = segments.len(), "hatch pass");
    segments
}

/// Walk one line from `-half` in 1 px steps and push its inside runs.
#[allow(clippy::cast_precision_loss)]
fn scan_line(
    mask: &GrayImage,
    anchor: Point,
    dir: &ScanDirection,
    half: f64,
    steps: usize,
    out: &mut Vec<Segment>,
) {
    let mut run: Option<(Point, Point)> = None;
    for i in 0..=steps {
        let s = -half + i as f64;
        let p = Point::new(dir.dx.mul_add(s, anchor.x), dir.dy.mul_add(s, anchor.y));
        if is_set(mask, round_half_up(p.x), round_half_up(p.y)) {
            run = Some(run.map_or((p, p), |(start, _)| (start, p)));
        } else if let Some((start, end)) = run.take() {
            out.push(Segment::new(start, end));
        }
    }
    if let Some((start, end)) = run {
        out.push(Segment::new(start, end));
    }
}

/// Nearest integer with halves rounding toward positive infinity.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;

    fn full(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    fn params(angle: f64, spacing: f64) -> HatchParams {
        HatchParams {
            angle,
            spacing,
            cross_hatch: false,
            cross_angle: 0.0,
        }
    }

    #[test]
    fn round_half_up_matches_floor_plus_half() {
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-0.51), -1);
        assert_eq!(round_half_up(2.49), 2);
    }

    #[test]
    fn horizontal_unit_spacing_gives_one_run_per_row() {
        let segments = hatch(&full(4, 4), &params(0.0, 1.0));
        assert_eq!(segments.len(), 4);
        let mut rows: Vec<f64> = segments.iter().map(|s| s.start.y).collect();
        rows.sort_by(f64::total_cmp);
        for (row, expected) in rows.iter().zip([0.0, 1.0, 2.0, 3.0]) {
            assert!((row - expected).abs() < 1e-9);
        }
        for s in &segments {
            assert!((s.start.y - s.end.y).abs() < 1e-9);
            // Samples start at -(hypot(4,4)/2 + 4) + 2 and step by 1 px.
            assert!((s.start.x - 0.171_572_875).abs() < 1e-6, "{s:?}");
            assert!((s.end.x - 3.171_572_875).abs() < 1e-6, "{s:?}");
        }
    }

    #[test]
    fn wide_spacing_hits_only_scanlines_inside_the_mask() {
        // Offsets step from -8 to 12 by 4: only y = 0 is inside a 4x4 mask.
        let segments = hatch(&full(4, 4), &params(0.0, 4.0));
        assert_eq!(segments.len(), 1);
        assert!(segments[0].start.y.abs() < 1e-9);
    }

    #[test]
    fn vertical_lines_at_ninety_degrees() {
        let segments = hatch(&full(4, 4), &params(90.0, 1.0));
        assert_eq!(segments.len(), 4);
        for s in &segments {
            assert!((s.start.x - s.end.x).abs() < 1e-9);
            assert!(s.start.y < s.end.y);
        }
    }

    #[test]
    fn empty_mask_yields_nothing() {
        let mask = GrayImage::new(16, 9);
        for angle in [0.0, 33.0, 45.0, 90.0, 135.0, 270.0] {
            for spacing in [0.5, 1.0, 3.7] {
                assert!(hatch_pass(&mask, angle, spacing).is_empty());
            }
        }
    }

    #[test]
    fn zero_sized_mask_yields_nothing() {
        assert!(hatch_pass(&GrayImage::new(0, 5), 45.0, 1.0).is_empty());
    }

    #[test]
    fn invalid_spacing_yields_nothing() {
        let mask = full(5, 5);
        for spacing in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(hatch_pass(&mask, 0.0, spacing).is_empty());
        }
    }

    #[test]
    fn spacing_below_minimum_yields_nothing() {
        let mask = full(4, 4);
        for spacing in [1e-20, 1e-6, MIN_SPACING_PX / 2.0] {
            assert!(hatch_pass(&mask, 0.0, spacing).is_empty());
        }
    }

    #[test]
    fn minimum_spacing_line_count_is_bounded() {
        // Offsets span 0..4 plus 2 * spacing of padding on each side.
        let segments = hatch_pass(&full(4, 4), 0.0, MIN_SPACING_PX);
        assert!(!segments.is_empty());
        assert!(segments.len() <= 45, "{}", segments.len());
    }

    #[test]
    fn full_mask_endpoints_stay_in_bounds() {
        let (w, h) = (23u32, 11u32);
        let mask = full(w, h);
        for angle in [0.0, 17.0, 45.0, 90.0, 123.0, 180.0, 300.0] {
            let segments = hatch_pass(&mask, angle, 2.5);
            assert!(!segments.is_empty(), "angle {angle}");
            for s in &segments {
                for p in [s.start, s.end] {
                    assert!(p.x >= -0.5 && p.x < f64::from(w) - 0.5, "{p:?} at {angle}");
                    assert!(p.y >= -0.5 && p.y < f64::from(h) - 0.5, "{p:?} at {angle}");
                }
            }
        }
    }

    #[test]
    fn full_mask_rows_are_covered() {
        // Horizontal unit-spaced lines touch every row of a full mask.
        let segments = hatch_pass(&full(10, 6), 0.0, 1.0);
        assert_eq!(segments.len(), 6);
        for s in &segments {
            assert!(s.length() > 8.0);
        }
    }

    #[test]
    fn gap_splits_a_line_into_two_runs() {
        let mut mask = full(9, 1);
        mask.put_pixel(4, 0, Luma([0]));
        let segments = hatch_pass(&mask, 0.0, 1.0);
        assert_eq!(segments.len(), 2);
        let mut xs: Vec<(f64, f64)> = segments.iter().map(|s| (s.start.x, s.end.x)).collect();
        xs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(xs[0].1 < 3.5);
        assert!(xs[1].0 >= 4.5);
    }

    #[test]
    fn single_pixel_run_is_a_point_segment() {
        let mut mask = GrayImage::new(7, 7);
        mask.put_pixel(3, 3, Luma([255]));
        let segments = hatch_pass(&mask, 0.0, 1.0);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].length() < 1e-9);
    }

    #[test]
    fn cross_hatch_appends_second_pass() {
        let mask = full(12, 8);
        let primary = hatch_pass(&mask, 30.0, 2.0);
        let cross = hatch_pass(&mask, 120.0, 2.0);
        let both = hatch(
            &mask,
            &HatchParams {
                angle: 30.0,
                spacing: 2.0,
                cross_hatch: true,
                cross_angle: 120.0,
            },
        );
        assert_eq!(both.len(), primary.len() + cross.len());
        assert_eq!(&both[..primary.len()], primary.as_slice());
        assert_eq!(&both[primary.len()..], cross.as_slice());
    }

    #[test]
    fn hatching_is_deterministic() {
        let mask = GrayImage::from_fn(20, 15, |x, y| {
            if (x * 7 + y * 3) % 5 < 3 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let p = HatchParams {
            angle: 37.0,
            spacing: 1.3,
            cross_hatch: true,
            cross_angle: 101.0,
        };
        assert_eq!(hatch(&mask, &p), hatch(&mask, &p));
    }
}

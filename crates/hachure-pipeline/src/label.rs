//! Full-resolution labeling and brightness ordering.
//!
//! After clustering on a sample, every source pixel is assigned to its
//! nearest final center. Centers are then sorted ascending by mean
//! brightness and every stored label is remapped, so layer `0` is always
//! the darkest color.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::quantize::{label_of, nearest_center, to_center};
use crate::types::{Center, Dimensions};

/// One cluster label per pixel, row-major, each `< k`.
///
/// Rebuilt wholesale on every analysis and never mutated in place
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u8>,
}

impl LabelMap {
    /// Label every pixel of `image` with its nearest center.
    ///
    /// Alpha is ignored. Ties go to the lowest center index.
    #[must_use]
    pub fn from_image(image: &RgbaImage, centers: &[Center]) -> Self {
        let labels = image
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                label_of(nearest_center(to_center([r, g, b]), centers))
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            labels,
        }
    }

    /// Build a label map from raw labels.
    ///
    /// Returns `None` if `labels.len()` does not equal `width * height`.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, labels: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        (labels.len() == expected).then_some(Self {
            width,
            height,
            labels,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Pixel dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Row-major labels.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.labels
    }

    /// Label at `(x, y)`, or `None` outside the map.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = usize::try_from(u64::from(y) * u64::from(self.width) + u64::from(x)).ok()?;
        self.labels.get(index).copied()
    }

    /// Number of pixels carrying `label`.
    #[must_use]
    pub fn count(&self, label: u8) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Rewrite every label through `remap` (`new = remap[old]`).
    pub fn remap(&mut self, remap: &[u8]) {
        apply_remap(&mut self.labels, remap);
    }
}

/// Mean brightness `(R + G + B) / 3` of a center.
#[must_use]
pub fn brightness(center: Center) -> f64 {
    (center[0] + center[1] + center[2]) / 3.0
}

/// Sort `centers` ascending by [`brightness`] (stable) and return the
/// old-to-new index table: `remap[old] == new`.
#[must_use]
pub fn sort_by_brightness(centers: &mut Vec<Center>) -> Vec<u8> {
    let mut order: Vec<usize> = (0..centers.len()).collect();
    order.sort_by(|&a, &b| brightness(centers[a]).total_cmp(&brightness(centers[b])));

    let mut remap = vec![0u8; centers.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = label_of(new);
    }

    *centers = order.iter().map(|&old| centers[old]).collect();
    remap
}

/// Rewrite labels in place through an old-to-new table.
pub fn apply_remap(labels: &mut [u8], remap: &[u8]) {
    for label in labels {
        if let Some(&new) = remap.get(usize::from(*label)) {
            *label = new;
        }
    }
}

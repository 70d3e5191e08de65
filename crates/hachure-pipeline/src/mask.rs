//! Binary layer masks.
//!
//! A layer mask marks the pixels that belong to one cluster label
//! (or, inverted, every pixel that does not). Masks use `255` for set
//! pixels so they can go straight into `imageproc` morphology.

use image::{GrayImage, Luma};

use crate::label::LabelMap;
use crate::morphology::{Morphology, open_or_passthrough};

/// Value of a set mask pixel.
pub const SET: u8 = 255;

/// Base mask for `target`: set where the label matches, XOR `invert`.
#[must_use]
pub fn build_mask(labels: &LabelMap, target: u8, invert: bool) -> GrayImage {
    let raw = labels
        .as_slice()
        .iter()
        .map(|&l| if (l == target) != invert { SET } else { 0 })
        .collect();
    GrayImage::from_raw(labels.width(), labels.height(), raw)
        .unwrap_or_else(|| GrayImage::new(labels.width(), labels.height()))
}

/// Full layer mask: base mask followed by an optional opening.
///
/// An erosion radius of zero skips the opening. Backend failures fall
/// back to the base mask.
#[must_use]
pub fn layer_mask<M: Morphology + std::fmt::Debug>(
    labels: &LabelMap,
    target: u8,
    invert: bool,
    erosion_radius: u32,
    backend: &M,
) -> GrayImage {
    open_or_passthrough(backend, build_mask(labels, target, invert), erosion_radius)
}

/// Whether the mask pixel at `(x, y)` is set. Out of bounds is clear.
#[must_use]
pub fn is_set(mask: &GrayImage, x: i64, y: i64) -> bool {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return false;
    };
    mask.get_pixel_checked(x, y)
        .is_some_and(|&Luma([v])| v != 0)
}

/// Number of set pixels.
#[must_use]
pub fn coverage(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::morphology::MorphologyKind;

    fn labels() -> LabelMap {
        // 0 0 1
        // 2 1 1
        LabelMap::from_raw(3, 2, vec![0, 0, 1, 2, 1, 1]).unwrap()
    }

    #[test]
    fn mask_matches_target_label() {
        let mask = build_mask(&labels(), 1, false);
        assert_eq!(mask.as_raw(), &vec![0, 0, SET, 0, SET, SET]);
    }

    #[test]
    fn invert_flips_every_pixel() {
        let map = labels();
        for target in 0..3 {
            let plain = build_mask(&map, target, false);
            let inverted = build_mask(&map, target, true);
            for (a, b) in plain.as_raw().iter().zip(inverted.as_raw()) {
                assert_ne!(*a == SET, *b == SET);
            }
        }
    }

    #[test]
    fn mask_agrees_with_labels_xor_invert() {
        let map = labels();
        for invert in [false, true] {
            let mask = build_mask(&map, 2, invert);
            for (i, &l) in map.as_slice().iter().enumerate() {
                assert_eq!(mask.as_raw()[i] == SET, (l == 2) != invert);
            }
        }
    }

    #[test]
    fn absent_label_gives_empty_mask() {
        let mask = build_mask(&labels(), 7, false);
        assert_eq!(coverage(&mask), 0);
    }

    #[test]
    fn layer_mask_applies_opening() {
        // 10x10 map with a single stray pixel of label 1.
        let mut raw = vec![0u8; 100];
        raw[55] = 1;
        let map = LabelMap::from_raw(10, 10, raw).unwrap();
        let opened = layer_mask(&map, 1, false, 1, &MorphologyKind::Reference);
        assert_eq!(coverage(&opened), 0);
        let untouched = layer_mask(&map, 1, false, 0, &MorphologyKind::Reference);
        assert_eq!(coverage(&untouched), 1);
    }

    #[test]
    fn unavailable_backend_keeps_base_mask() {
        let mut raw = vec![0u8; 100];
        raw[55] = 1;
        let map = LabelMap::from_raw(10, 10, raw).unwrap();
        let mask = layer_mask(&map, 1, false, 2, &MorphologyKind::Disabled);
        assert_eq!(coverage(&mask), 1);
    }

    #[test]
    fn is_set_treats_out_of_bounds_as_clear() {
        let mask = build_mask(&labels(), 0, false);
        assert!(is_set(&mask, 0, 0));
        assert!(!is_set(&mask, 2, 0));
        assert!(!is_set(&mask, -1, 0));
        assert!(!is_set(&mask, 0, 2));
        assert!(!is_set(&mask, 3, 1));
    }
}

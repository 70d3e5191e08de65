//! Morphological opening of binary layer masks.
//!
//! This module defines the [`Morphology`] trait for pluggable opening
//! backends and the [`MorphologyKind`] enum for selecting one at runtime.
//!
//! # Strategy pattern
//!
//! Opening (erosion followed by dilation with the same disk-shaped
//! structuring element) removes specks and thin protrusions before
//! hatching. The `imageproc` backend is the fast path; the reference
//! backend is a plain loop over the same disk so both can be checked
//! against each other. A backend that fails or is unavailable never
//! fails the caller: [`open_or_passthrough`] logs and falls back to the
//! un-eroded mask.

use std::fmt;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Selects which opening backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MorphologyKind {
    /// Grayscale opening via `imageproc::morphology` with a disk mask.
    ///
    /// Radii are limited to `u8::MAX`; larger ones go to the reference
    /// backend through [`open_or_passthrough`].
    #[default]
    Imageproc,
    /// Pure loop over disk offsets. Slow, no radius limit.
    Reference,
    /// No backend: every opening request reports
    /// [`MorphologyError::Unavailable`].
    Disabled,
}

impl fmt::Display for MorphologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imageproc => f.write_str("Imageproc"),
            Self::Reference => f.write_str("Reference"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Reasons an opening backend could not run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MorphologyError {
    /// The selected backend is not available.
    #[error("morphology backend {0} is unavailable")]
    Unavailable(MorphologyKind),

    /// The backend cannot represent a structuring element this large.
    #[error("erosion radius {radius} exceeds the backend limit of {max}")]
    RadiusTooLarge {
        /// Requested radius in pixels.
        radius: u32,
        /// Largest radius the backend supports.
        max: u32,
    },
}

/// Trait for morphological opening strategies.
///
/// Input and output masks use `255` for set pixels and `0` for clear
/// ones.
pub trait Morphology {
    /// Open `mask` with a disk of the given radius (diameter `2r + 1`).
    ///
    /// # Errors
    ///
    /// Returns [`MorphologyError`] if the backend cannot run.
    fn open(&self, mask: &GrayImage, radius: u32) -> Result<GrayImage, MorphologyError>;
}

impl Morphology for MorphologyKind {
    fn open(&self, mask: &GrayImage, radius: u32) -> Result<GrayImage, MorphologyError> {
        match *self {
            Self::Imageproc => open_imageproc(mask, radius),
            Self::Reference => Ok(open_reference(mask, radius)),
            Self::Disabled => Err(MorphologyError::Unavailable(*self)),
        }
    }
}

/// Open `mask` with `backend`, or return it unchanged on failure.
///
/// A radius the backend cannot represent is retried on the reference
/// backend. A radius of zero is a no-op and never touches the backend.
#[must_use]
pub fn open_or_passthrough<M: Morphology + fmt::Debug>(
    backend: &M,
    mask: GrayImage,
    radius: u32,
) -> GrayImage {
    if radius == 0 {
        return mask;
    }
    match backend.open(&mask, radius) {
        Ok(opened) => opened,
        Err(MorphologyError::RadiusTooLarge { max, .. }) => {
            tracing::debug!(?backend, radius, max, "radius over backend limit, using reference");
            open_reference(&mask, radius)
        }
        Err(e) => {
            tracing::warn!(?backend, radius, error = %e, "opening skipped, using un-eroded mask");
            mask
        }
    }
}

fn open_imageproc(mask: &GrayImage, radius: u32) -> Result<GrayImage, MorphologyError> {
    let r = u8::try_from(radius).map_err(|_| MorphologyError::RadiusTooLarge {
        radius,
        max: u32::from(u8::MAX),
    })?;
    let element = imageproc::morphology::Mask::disk(r);
    Ok(imageproc::morphology::grayscale_open(mask, &element))
}

/// Offsets `(dx, dy)` with `dx² + dy² ≤ r²`.
pub(crate) fn disk_offsets(radius: u32) -> Vec<(i64, i64)> {
    let r = i64::from(radius);
    let r2 = r * r;
    (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx * dx + dy * dy <= r2)
        .collect()
}

/// Reference opening: erode then dilate over the disk, ignoring
/// offsets that fall outside the image.
fn open_reference(mask: &GrayImage, radius: u32) -> GrayImage {
    let offsets = disk_offsets(radius);
    let eroded = filter_disk(mask, &offsets, u8::min, u8::MAX);
    filter_disk(&eroded, &offsets, u8::max, u8::MIN)
}

fn filter_disk(
    image: &GrayImage,
    offsets: &[(i64, i64)],
    combine: fn(u8, u8) -> u8,
    identity: u8,
) -> GrayImage {
    let (w, h) = image.dimensions();
    let (wi, hi) = (i64::from(w), i64::from(h));
    GrayImage::from_fn(w, h, |x, y| {
        let (xi, yi) = (i64::from(x), i64::from(y));
        let value = offsets
            .iter()
            .filter_map(|&(dx, dy)| {
                let (nx, ny) = (xi + dx, yi + dy);
                if nx < 0 || ny < 0 || nx >= wi || ny >= hi {
                    return None;
                }
                let nx = u32::try_from(nx).ok()?;
                let ny = u32::try_from(ny).ok()?;
                Some(image.get_pixel(nx, ny).0[0])
            })
            .fold(identity, combine);
        Luma([value])
    })
}

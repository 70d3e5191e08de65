//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! pixel buffer the rest of the pipeline works on. Alpha is carried but
//! ignored by clustering, which only looks at the RGB channels.

use image::{DynamicImage, RgbaImage};

use crate::types::PipelineError;

/// Decode raw image bytes into a [`DynamicImage`].
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

/// Decode raw image bytes straight into a row-major RGBA buffer.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    decode(bytes).map(|img| img.to_rgba8())
}

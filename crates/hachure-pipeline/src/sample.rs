//! Pixel sampling for clustering.
//!
//! Draws a uniform random subset of pixel colors (without replacement)
//! from the working image. Clustering runs on this subset only; the
//! full-resolution label map is built afterwards against the final
//! centers.

use image::RgbaImage;
use rand::Rng;

use crate::types::Rgb;

/// Pick up to `max_samples` distinct pixels uniformly at random and
/// return their RGB colors.
///
/// When the image has no more than `max_samples` pixels every pixel is
/// taken, in a shuffled order.
#[must_use]
pub fn sample_pixels<R: Rng + ?Sized>(
    image: &RgbaImage,
    max_samples: usize,
    rng: &mut R,
) -> Vec<Rgb> {
    let raw = image.as_raw();
    let total = raw.len() / 4;
    let amount = total.min(max_samples);

    rand::seq::index::sample(rng, total, amount)
        .into_iter()
        .map(|i| {
            let p = i * 4;
            [raw[p], raw[p + 1], raw[p + 2]]
        })
        .collect()
}

/// Number of distinct colors in a sample.
#[must_use]
pub fn distinct_colors(samples: &[Rgb]) -> usize {
    samples
        .iter()
        .copied()
        .collect::<std::collections::HashSet<Rgb>>()
        .len()
}

//! Color quantization by k-means clustering in RGB space.
//!
//! Reduces a pixel sample to `k` representative centers plus a
//! best-center label for every sample point:
//!
//! 1. **k-means++ seeding**: the first center is a uniform pick; each
//!    following center is drawn with probability proportional to the
//!    squared distance to the nearest center chosen so far.
//! 2. **Lloyd iterations**: assign every point to its nearest center
//!    (first minimum wins), move every center to the mean of its points
//!    (empty clusters stay put), and stop once the largest center
//!    displacement is within `tolerance`.
//!
//! The random source is injected so runs are reproducible under a fixed
//! seed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sample::distinct_colors;
use crate::types::{Center, PipelineError, Rgb};

/// Smallest supported cluster count.
pub const MIN_K: usize = 2;

/// Largest supported cluster count. Labels are stored as `u8`.
pub const MAX_K: usize = 12;

/// Weight given to a zero seeding distance so the D² distribution
/// never has all-zero mass.
pub const SEED_EPSILON: f64 = 1e-12;

/// Iteration cap and convergence threshold for the Lloyd loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansOptions {
    /// Maximum number of Lloyd iterations.
    pub iters: usize,
    /// Stop once no center moves further than this (RGB units, 0..255).
    pub tolerance: f64,
}

impl KMeansOptions {
    /// Default iteration cap.
    pub const DEFAULT_ITERS: usize = 15;
    /// Default convergence tolerance in RGB units.
    pub const DEFAULT_TOLERANCE: f64 = 0.5;
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            iters: Self::DEFAULT_ITERS,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// Output of a k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Exactly `k` centers, in seeding order.
    pub centers: Vec<Center>,
    /// Nearest-center label for every input sample, each `< k`.
    pub labels: Vec<u8>,
    /// Number of Lloyd iterations performed.
    pub iterations: usize,
    /// Whether the run stopped on the tolerance rather than the cap.
    pub converged: bool,
}

/// Clamp a cluster count into `[MIN_K, MAX_K]`.
#[must_use]
pub fn clamp_k(k: usize) -> usize {
    k.clamp(MIN_K, MAX_K)
}

/// Pick `k` from the sample itself: `round(sqrt(distinct colors))`,
/// clamped into `[MIN_K, MAX_K]`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn auto_k(samples: &[Rgb]) -> usize {
    let estimate = (distinct_colors(samples) as f64).sqrt().round() as usize;
    clamp_k(estimate)
}

/// Resolve a requested cluster count: zero or negative selects
/// [`auto_k`], anything else is clamped.
#[must_use]
pub fn resolve_k(requested: i32, samples: &[Rgb]) -> usize {
    usize::try_from(requested)
        .ok()
        .filter(|&k| k > 0)
        .map_or_else(|| auto_k(samples), clamp_k)
}

/// Squared Euclidean distance in RGB space.
#[must_use]
pub fn distance_squared(a: Center, b: Center) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr.mul_add(dr, dg.mul_add(dg, db * db))
}

/// Widen an 8-bit color to a floating center.
#[must_use]
pub fn to_center(rgb: Rgb) -> Center {
    rgb.map(f64::from)
}

/// Index of the nearest center; ties go to the lowest index.
///
/// Returns 0 for an empty center set.
#[must_use]
pub fn nearest_center(color: Center, centers: &[Center]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &c) in centers.iter().enumerate() {
        let d = distance_squared(color, c);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

/// Narrow a center index to a stored label.
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn label_of(index: usize) -> u8 {
    debug_assert!(index < MAX_K);
    index as u8
}

/// Cluster `samples` into `k` colors (`k` clamped to `[MIN_K, MAX_K]`).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `samples` is empty.
pub fn kmeans<R: Rng + ?Sized>(
    samples: &[Rgb],
    k: usize,
    options: &KMeansOptions,
    rng: &mut R,
) -> Result<Clustering, PipelineError> {
    if samples.is_empty() {
        return Err(PipelineError::InvalidInput(
            "cannot cluster an empty pixel sample".to_string(),
        ));
    }
    let k = clamp_k(k);
    let points: Vec<Center> = samples.iter().copied().map(to_center).collect();

    let mut centers = seed_plus_plus(&points, k, rng);
    let mut labels = vec![0u8; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..options.iters {
        iterations += 1;
        assign(&points, &centers, &mut labels);
        let updated = update_centers(&points, &labels, &centers);
        let shift = max_shift(&centers, &updated);
        centers = updated;
        if shift <= options.tolerance {
            converged = true;
            break;
        }
    }

    // Labels always reflect the final centers.
    assign(&points, &centers, &mut labels);

    tracing::debug!(k, iterations, converged, samples = points.len(), "k-means finished");

    Ok(Clustering {
        centers,
        labels,
        iterations,
        converged,
    })
}

/// k-means++ seeding.
///
/// A single cumulative pass over the epsilon-floored weights picks the
/// first index where the running remainder drops to zero; rounding
/// residue falls through to the last index. Duplicate centers are
/// possible when the sample has fewer distinct colors than `k`.
fn seed_plus_plus<R: Rng + ?Sized>(points: &[Center], k: usize, rng: &mut R) -> Vec<Center> {
    let weight = |d: f64| if d > 0.0 { d } else { SEED_EPSILON };

    let mut centers = Vec::with_capacity(k);
    let first = points[rng.random_range(0..points.len())];
    centers.push(first);

    let mut nearest: Vec<f64> = points.iter().map(|&p| distance_squared(p, first)).collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().map(|&d| weight(d)).sum();
        let mut remainder = rng.random::<f64>() * total;

        let mut chosen = points.len() - 1;
        for (i, &d) in nearest.iter().enumerate() {
            remainder -= weight(d);
            if remainder <= 0.0 {
                chosen = i;
                break;
            }
        }

        let center = points[chosen];
        centers.push(center);
        for (n, &p) in nearest.iter_mut().zip(points) {
            *n = n.min(distance_squared(p, center));
        }
    }

    centers
}

/// E-step: label every point with its nearest center.
fn assign(points: &[Center], centers: &[Center], labels: &mut [u8]) {
    for (label, &p) in labels.iter_mut().zip(points) {
        *label = label_of(nearest_center(p, centers));
    }
}

/// M-step: move each center to the mean of its points. Centers with no
/// points keep their previous position.
#[allow(clippy::cast_precision_loss)]
fn update_centers(points: &[Center], labels: &[u8], previous: &[Center]) -> Vec<Center> {
    let mut sums = vec![[0.0f64; 3]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (&p, &label) in points.iter().zip(labels) {
        let i = usize::from(label);
        for (s, v) in sums[i].iter_mut().zip(p) {
            *s += v;
        }
        counts[i] += 1;
    }

    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), &prev)| {
            if count == 0 {
                prev
            } else {
                let n = count as f64;
                sum.map(|s| s / n)
            }
        })
        .collect()
}

/// Largest Euclidean displacement between matching centers.
fn max_shift(old: &[Center], new: &[Center]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(&a, &b)| distance_squared(a, b).sqrt())
        .fold(0.0, f64::max)
}

//! Color analysis: from a decoded image to brightness-ordered layers.
//!
//! # Stages
//!
//! 1. Downsample to the working resolution (sampling only)
//! 2. Draw a uniform random pixel sample
//! 3. Resolve `k` and run k-means
//! 4. Label every full-resolution pixel with its nearest center
//! 5. Sort centers by brightness and relabel everything
//!
//! Nothing here mutates caller state; [`Session`](crate::Session)
//! commits the returned [`Analysis`] only when every stage succeeded.

use image::RgbaImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{
    AnalysisDiagnostics, AnalysisSummary, Clock, StageDiagnostics, StageMetrics, timed,
};
use crate::downsample::downsample;
use crate::label::{LabelMap, apply_remap, sort_by_brightness};
use crate::quantize::{kmeans, resolve_k};
use crate::sample::{distinct_colors, sample_pixels};
use crate::types::{AnalysisConfig, Center, PipelineError, Rgb, center_to_rgb};

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    centers: Vec<Center>,
    labels: LabelMap,
    sample_labels: Vec<u8>,
    iterations: usize,
    converged: bool,
}

impl Analysis {
    /// Cluster centers, darkest first.
    #[must_use]
    pub fn centers(&self) -> &[Center] {
        &self.centers
    }

    /// Number of layers (`k`).
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.centers.len()
    }

    /// Rounded 8-bit color of `layer`.
    #[must_use]
    pub fn color(&self, layer: usize) -> Option<Rgb> {
        self.centers.get(layer).copied().map(center_to_rgb)
    }

    /// Rounded 8-bit colors of every layer, darkest first.
    #[must_use]
    pub fn colors(&self) -> Vec<Rgb> {
        self.centers.iter().copied().map(center_to_rgb).collect()
    }

    /// Full-resolution label map.
    #[must_use]
    pub const fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Labels of the clustered sample, in sample order.
    #[must_use]
    pub fn sample_labels(&self) -> &[u8] {
        &self.sample_labels
    }

    /// Lloyd iterations the clustering took.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether clustering stopped on the tolerance.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }
}

/// Run the full analysis on `image`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image has no pixels
/// or `config.max_samples` is zero (the sample would be empty).
pub fn analyze<R, C>(
    image: &RgbaImage,
    config: &AnalysisConfig,
    rng: &mut R,
    clock: &C,
) -> Result<(Analysis, AnalysisDiagnostics), PipelineError>
where
    R: Rng + ?Sized,
    C: Clock,
{
    let start = clock.now();
    let (original_width, original_height) = image.dimensions();

    // 1. Working copy.
    let ((working, applied), downsample_time) = timed(clock, || {
        downsample(image, config.working_resolution, config.downsample_filter)
    });
    let (width, height) = working.dimensions();
    let downsample_diag = StageDiagnostics {
        duration: downsample_time,
        metrics: StageMetrics::Downsample {
            original_width,
            original_height,
            width,
            height,
            filter: config.downsample_filter.to_string(),
            applied,
        },
    };

    // 2. Sample.
    let (samples, sample_time) = timed(clock, || sample_pixels(&working, config.max_samples, rng));
    drop(working);
    let distinct = distinct_colors(&samples);
    tracing::debug!(samples = samples.len(), distinct, "pixels sampled");
    let sample_diag = StageDiagnostics {
        duration: sample_time,
        metrics: StageMetrics::Sample {
            sample_count: samples.len(),
            distinct_colors: distinct,
        },
    };

    // 3. Cluster.
    let k = resolve_k(config.requested_k, &samples);
    let (clustering, cluster_time) = timed(clock, || kmeans(&samples, k, &config.kmeans, rng));
    let clustering = clustering?;
    let cluster_diag = StageDiagnostics {
        duration: cluster_time,
        metrics: StageMetrics::Cluster {
            requested_k: config.requested_k,
            k,
            iterations: clustering.iterations,
            converged: clustering.converged,
        },
    };

    // 4. Full-resolution labels.
    let (mut labels, label_time) =
        timed(clock, || LabelMap::from_image(image, &clustering.centers));
    let pixel_count = labels.dimensions().pixel_count();
    let label_diag = StageDiagnostics {
        duration: label_time,
        metrics: StageMetrics::Label { pixel_count },
    };

    // 5. Brightness order.
    let mut centers = clustering.centers;
    let mut sample_labels = clustering.labels;
    let (remap, sort_time) = timed(clock, || {
        let remap = sort_by_brightness(&mut centers);
        apply_remap(&mut sample_labels, &remap);
        labels.remap(&remap);
        remap
    });
    let sort_diag = StageDiagnostics {
        duration: sort_time,
        metrics: StageMetrics::Sort { remap },
    };

    let layer_pixels = (0..centers.len())
        .map(|layer| labels.count(crate::quantize::label_of(layer)))
        .collect();

    tracing::debug!(
        k,
        iterations = clustering.iterations,
        converged = clustering.converged,
        "analysis complete"
    );

    let diagnostics = AnalysisDiagnostics {
        downsample: downsample_diag,
        sample: sample_diag,
        cluster: cluster_diag,
        label: label_diag,
        sort: sort_diag,
        total_duration: clock.elapsed(&start),
        summary: AnalysisSummary {
            image_width: original_width,
            image_height: original_height,
            pixel_count,
            layer_count: centers.len(),
            layer_pixels,
        },
    };

    let analysis = Analysis {
        centers,
        labels,
        sample_labels,
        iterations: clustering.iterations,
        converged: clustering.converged,
    };
    Ok((analysis, diagnostics))
}

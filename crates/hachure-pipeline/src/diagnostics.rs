//! Analysis diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every call to
//! [`Session::analyze_with_diagnostics`](crate::Session::analyze_with_diagnostics)
//! collects these alongside the clustering result. They are permanent
//! instrumentation for tuning sample sizes, working resolution and
//! k-means parameters.
//!
//! Timestamps come from a [`Clock`] so tests and callers can supply
//! their own time source; [`SystemClock`] uses the `web-time` crate.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by `web_time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Stage 1: working-copy downsampling.
    pub downsample: StageDiagnostics,
    /// Stage 2: random pixel sampling.
    pub sample: StageDiagnostics,
    /// Stage 3: k-means clustering.
    pub cluster: StageDiagnostics,
    /// Stage 4: full-resolution nearest-center labeling.
    pub label: StageDiagnostics,
    /// Stage 5: brightness sort and relabel.
    pub sort: StageDiagnostics,
    /// Total wall-clock duration of the analysis (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: AnalysisSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Working-copy metrics.
    Downsample {
        /// Source width in pixels.
        original_width: u32,
        /// Source height in pixels.
        original_height: u32,
        /// Working copy width in pixels.
        width: u32,
        /// Working copy height in pixels.
        height: u32,
        /// Resampling filter name.
        filter: String,
        /// Whether a resize actually happened.
        applied: bool,
    },
    /// Sampling metrics.
    Sample {
        /// Pixels drawn.
        sample_count: usize,
        /// Distinct colors among them.
        distinct_colors: usize,
    },
    /// Clustering metrics.
    Cluster {
        /// Requested `k` before resolution (`<= 0` means automatic).
        requested_k: i32,
        /// Resolved `k`.
        k: usize,
        /// Lloyd iterations performed.
        iterations: usize,
        /// Whether the tolerance was reached before the cap.
        converged: bool,
    },
    /// Full-resolution labeling metrics.
    Label {
        /// Labeled pixel count.
        pixel_count: u64,
    },
    /// Brightness ordering metrics.
    Sort {
        /// Old-to-new layer index table.
        remap: Vec<u8>,
    },
}

/// High-level summary for the whole analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of layers produced.
    pub layer_count: usize,
    /// Pixels per layer, darkest first.
    pub layer_pixels: Vec<usize>,
}

impl AnalysisDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Downsample", &self.downsample),
            ("Sample", &self.sample),
            ("Cluster", &self.cluster),
            ("Label", &self.label),
            ("Sort", &self.sort),
        ];

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        let pixels: Vec<String> = self
            .summary
            .layer_pixels
            .iter()
            .map(ToString::to_string)
            .collect();
        lines.push(format!(
            "Layers: {}  |  Pixels per layer: {}",
            self.summary.layer_count,
            pixels.join(", "),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Downsample {
            original_width,
            original_height,
            width,
            height,
            filter,
            applied,
        } => {
            if *applied {
                format!("{original_width}x{original_height} -> {width}x{height} ({filter})")
            } else {
                format!("{width}x{height} (unchanged)")
            }
        }
        StageMetrics::Sample {
            sample_count,
            distinct_colors,
        } => format!("{sample_count} px, {distinct_colors} distinct colors"),
        StageMetrics::Cluster {
            requested_k,
            k,
            iterations,
            converged,
        } => {
            let requested = if *requested_k <= 0 {
                "auto".to_string()
            } else {
                requested_k.to_string()
            };
            let stop = if *converged { "converged" } else { "capped" };
            format!("k={k} (requested {requested}) {iterations} iters, {stop}")
        }
        StageMetrics::Label { pixel_count } => format!("{pixel_count} px"),
        StageMetrics::Sort { remap } => format!("remap={remap:?}"),
    }
}

/// Time `f` with `clock`, returning its value and the elapsed duration.
pub(crate) fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

//! hachure-pipeline: Pure color-separation and hatching pipeline (sans-IO).
//!
//! Converts a raster image into brightness-ordered color layers, each
//! filled with straight hatch strokes:
//! decode -> downsample + sample -> k-means -> full-resolution labels ->
//! brightness sort -> per layer (mask -> opening -> hatch), cached.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Rendering to SVG and writing
//! files live in `hachure-export` and the `hachure` CLI.
//!
//! The usual entry point is [`Session`]:
//!
//! ```no_run
//! # fn run(bytes: &[u8]) -> Result<(), hachure_pipeline::PipelineError> {
//! let mut session = hachure_pipeline::Session::from_bytes(bytes)?;
//! session.analyze()?;
//! for layer in session.visible_layers() {
//!     let segments = session.layer_segments(layer)?;
//!     println!("layer {layer}: {} strokes", segments.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod decode;
pub mod density;
pub mod diagnostics;
pub mod downsample;
pub mod hatch;
pub mod label;
pub mod mask;
pub mod morphology;
pub mod quantize;
pub mod sample;
pub mod session;
pub mod types;

pub use analysis::{Analysis, analyze};
pub use cache::{CacheKey, SegmentCache};
pub use diagnostics::{AnalysisDiagnostics, Clock, SystemClock};
pub use downsample::DownsampleFilter;
pub use hatch::{HatchParams, MIN_SPACING_PX, hatch};
pub use label::LabelMap;
pub use morphology::{Morphology, MorphologyError, MorphologyKind};
pub use quantize::{Clustering, KMeansOptions, kmeans};
pub use session::{ErosionOverride, LayerSettings, Session};
pub use types::{
    AnalysisConfig, Border, BorderUnit, Center, DEFAULT_PPI, Dimensions, GrayImage,
    HatchSettings, MM_PER_INCH, PipelineError, Point, Rgb, RgbaImage, Segment,
};

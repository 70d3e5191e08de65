//! hachure: convert a raster image into hatched SVG color layers.
//!
//! Reads an image, clusters its colors into brightness-ordered layers,
//! hatches each layer and writes one SVG per visible layer plus a
//! composite of all of them. Analysis diagnostics go to stdout, either
//! as a human-readable report or as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hachure -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=hachure_pipeline=debug` to trace pipeline stages.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use hachure_export::{ExportError, ExportFile, ExportOptions, ExportSink};
use hachure_pipeline::{
    AnalysisConfig, Border, BorderUnit, DownsampleFilter, ErosionOverride, HatchSettings,
    KMeansOptions, MorphologyKind, Session,
};
use hachure_pipeline::mask::coverage;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Convert a raster image into color-separated, hatched SVG layers.
///
/// Layer numbers on the command line and in filenames are 1-based and
/// ordered from darkest to lightest.
#[derive(Parser)]
#[command(name = "hachure", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Number of color layers (0 picks automatically; otherwise 2-12).
    #[arg(
        short,
        long,
        default_value_t = AnalysisConfig::DEFAULT_REQUESTED_K,
        allow_negative_numbers = true
    )]
    k: i32,

    /// Maximum k-means iterations.
    #[arg(long, default_value_t = KMeansOptions::DEFAULT_ITERS)]
    iters: usize,

    /// Convergence tolerance: largest center shift in RGB units.
    #[arg(long, default_value_t = KMeansOptions::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Maximum number of pixels sampled for clustering.
    #[arg(
        long,
        default_value_t = AnalysisConfig::DEFAULT_MAX_SAMPLES,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_samples: usize,

    /// Working resolution for sampling (max dimension in pixels).
    #[arg(
        long,
        default_value_t = AnalysisConfig::DEFAULT_WORKING_RESOLUTION,
        value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..)
    )]
    working_resolution: u32,

    /// Downsample filter used before sampling.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    downsample_filter: Filter,

    /// Seed for sampling and k-means++ (random when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Morphology backend for erosion.
    #[arg(long, value_enum, default_value_t = Morphology::Imageproc)]
    morphology: Morphology,

    /// Hatch angle in degrees.
    #[arg(long, default_value_t = HatchSettings::DEFAULT_ANGLE, allow_negative_numbers = true)]
    angle: f64,

    /// Distance between hatch lines in millimetres.
    #[arg(long, default_value_t = HatchSettings::DEFAULT_SPACING_MM)]
    spacing_mm: f64,

    /// Add a second hatch pass at `--cross-angle`.
    #[arg(long)]
    cross: bool,

    /// Cross-hatch angle in degrees.
    #[arg(
        long,
        default_value_t = HatchSettings::DEFAULT_CROSS_ANGLE,
        allow_negative_numbers = true
    )]
    cross_angle: f64,

    /// Stroke width in millimetres.
    #[arg(long, default_value_t = HatchSettings::DEFAULT_STROKE_MM)]
    stroke_mm: f64,

    /// Hatch everything except each layer's color.
    #[arg(long)]
    invert: bool,

    /// Blank border around every document, in `--border-unit`s.
    #[arg(long)]
    border: Option<f64>,

    /// Unit of `--border`.
    #[arg(long, value_enum, default_value_t = Unit::In)]
    border_unit: Unit,

    /// Erosion (opening) radius in pixels applied to every layer.
    #[arg(long, default_value_t = HatchSettings::DEFAULT_EROSION_RADIUS)]
    erosion: u32,

    /// Per-layer erosion override as `LAYER=RADIUS` (repeatable).
    #[arg(long = "layer-erosion", value_name = "LAYER=RADIUS")]
    layer_erosion: Vec<LayerErosion>,

    /// Leave a layer out of the export (repeatable).
    #[arg(
        long = "hide-layer",
        value_name = "LAYER",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    hide_layer: Vec<usize>,

    /// Pixel density override; otherwise read from the image or 300.
    #[arg(long)]
    ppi: Option<f64>,

    /// Directory the SVG files are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Skip the per-layer files.
    #[arg(long)]
    no_layers: bool,

    /// Skip the composite file.
    #[arg(long)]
    no_composite: bool,

    /// Draw a contrasting background behind each single-layer file.
    #[arg(long)]
    layer_background: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full analysis and hatch config as a JSON string.
    ///
    /// When provided, all other analysis and hatch flags are ignored.
    /// The JSON must be a valid `RunConfig` serialization, i.e.
    /// `{"analysis": {...}, "hatch": {...}}`.
    #[arg(long)]
    config_json: Option<String>,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Disabled: sample the full-resolution image.
    Disabled,
    /// Nearest-neighbor (fastest, never blends colors).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

/// Maps a [`DownsampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: DownsampleFilter) -> Filter {
    match f {
        DownsampleFilter::Disabled => Filter::Disabled,
        DownsampleFilter::Nearest => Filter::Nearest,
        DownsampleFilter::Triangle => Filter::Triangle,
        DownsampleFilter::CatmullRom => Filter::CatmullRom,
        DownsampleFilter::Gaussian => Filter::Gaussian,
        DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`AnalysisConfig::DEFAULT_DOWNSAMPLE_FILTER`] so the two cannot
/// silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(AnalysisConfig::DEFAULT_DOWNSAMPLE_FILTER);

/// Morphology backend selection.
#[derive(Clone, Copy, ValueEnum)]
enum Morphology {
    /// `imageproc` grayscale opening (radius up to 255).
    Imageproc,
    /// Pure-Rust disk opening.
    Reference,
    /// No backend: erosion requests fall back to the plain mask.
    Disabled,
}

/// Border unit selection.
#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    /// Inches.
    In,
    /// Millimetres.
    Mm,
}

/// One `--layer-erosion LAYER=RADIUS` argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LayerErosion {
    /// 1-based layer number.
    layer: usize,
    radius: u32,
}

impl FromStr for LayerErosion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (layer, radius) = s
            .split_once('=')
            .ok_or_else(|| format!("expected LAYER=RADIUS, got {s:?}"))?;
        let layer: usize = layer
            .trim()
            .parse()
            .map_err(|e| format!("bad layer number {layer:?}: {e}"))?;
        if layer == 0 {
            return Err("layer numbers start at 1".to_owned());
        }
        let radius = radius
            .trim()
            .parse()
            .map_err(|e| format!("bad radius {radius:?}: {e}"))?;
        Ok(Self { layer, radius })
    }
}

/// Everything that shapes the output, serialized into each SVG's
/// `<metadata>` and accepted back through `--config-json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct RunConfig {
    analysis: AnalysisConfig,
    hatch: HatchSettings,
}

/// Build a [`RunConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<RunConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let analysis = AnalysisConfig {
        requested_k: cli.k,
        kmeans: KMeansOptions {
            iters: cli.iters,
            tolerance: cli.tolerance,
        },
        max_samples: cli.max_samples,
        working_resolution: cli.working_resolution,
        downsample_filter: match cli.downsample_filter {
            Filter::Disabled => DownsampleFilter::Disabled,
            Filter::Nearest => DownsampleFilter::Nearest,
            Filter::Triangle => DownsampleFilter::Triangle,
            Filter::CatmullRom => DownsampleFilter::CatmullRom,
            Filter::Gaussian => DownsampleFilter::Gaussian,
            Filter::Lanczos3 => DownsampleFilter::Lanczos3,
        },
        seed: cli.seed,
        morphology: match cli.morphology {
            Morphology::Imageproc => MorphologyKind::Imageproc,
            Morphology::Reference => MorphologyKind::Reference,
            Morphology::Disabled => MorphologyKind::Disabled,
        },
    };

    let hatch = HatchSettings {
        angle: cli.angle,
        spacing_mm: cli.spacing_mm,
        cross_hatch: cli.cross,
        cross_angle: cli.cross_angle,
        stroke_mm: cli.stroke_mm,
        invert: cli.invert,
        border: cli.border.map_or_else(Border::default, |size| Border {
            enabled: true,
            size,
            unit: match cli.border_unit {
                Unit::In => BorderUnit::Inches,
                Unit::Mm => BorderUnit::Millimeters,
            },
        }),
        erosion_radius: cli.erosion,
    };

    Ok(RunConfig { analysis, hatch })
}

/// [`ExportSink`] writing each file into a directory.
struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create `dir` if needed.
    fn create(dir: &Path) -> Result<Self, ExportError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ExportError::Unavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl ExportSink for DirectorySink {
    fn write_file(&mut self, file: &ExportFile) -> Result<(), ExportError> {
        let path = self.dir.join(&file.name);
        std::fs::write(&path, &file.contents).map_err(|source| ExportError::Io {
            name: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = file.contents.len(), "file written");
        Ok(())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply `--layer-erosion` and `--hide-layer` once the layer count is known.
fn apply_layer_flags(cli: &Cli, session: &mut Session) -> Result<(), String> {
    for &LayerErosion { layer, radius } in &cli.layer_erosion {
        session
            .set_layer_erosion(layer - 1, ErosionOverride::Radius(radius))
            .map_err(|e| format!("--layer-erosion {layer}={radius}: {e}"))?;
    }
    for &layer in &cli.hide_layer {
        session
            .set_layer_visible(layer - 1, false)
            .map_err(|e| format!("--hide-layer {layer}: {e}"))?;
    }
    Ok(())
}

fn print_layer_table(session: &Session) {
    let Some(analysis) = session.analysis() else {
        return;
    };
    let pixels = session.dimensions().pixel_count().max(1);
    eprintln!(
        "{:<7} {:<9} {:<24} {:>7} {:>9} {:>8}",
        "Layer", "Color", "Name", "Erosion", "Coverage", "Visible"
    );
    for (layer, color) in analysis.colors().into_iter().enumerate() {
        let named = hachure_export::nearest_named_color(color);
        let erosion = session.effective_erosion(layer).unwrap_or_default();
        let visible = session
            .layer_settings(layer)
            .is_ok_and(|settings| settings.visible);
        let covered = session
            .layer_mask(layer)
            .map_or(0, |mask| coverage(&mask));
        #[allow(clippy::cast_precision_loss)]
        let percent = covered as f64 * 100.0 / pixels as f64;
        eprintln!(
            "{:<7} {:<9} {:<24} {:>7} {:>8.1}% {:>8}",
            layer + 1,
            hachure_export::hex_color(color),
            named.name,
            erosion,
            percent,
            if visible { "yes" } else { "no" },
        );
    }
    eprintln!();
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );

    let mut session =
        Session::from_bytes(&image_bytes).map_err(|e| format!("Pipeline error: {e}"))?;
    session
        .set_ppi_override(cli.ppi)
        .map_err(|e| format!("--ppi: {e}"))?;
    session.set_analysis_config(config.analysis);
    session.set_settings(config.hatch);

    let dims = session.dimensions();
    eprintln!(
        "Size: {}x{} px at {} ppi{}",
        dims.width,
        dims.height,
        session.ppi(),
        if session.detected_ppi().is_some() && cli.ppi.is_none() {
            " (from file)"
        } else {
            ""
        },
    );
    eprintln!();

    let diagnostics = session
        .analyze_with_diagnostics()
        .map_err(|e| format!("Pipeline error: {e}"))?;
    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }

    apply_layer_flags(cli, &mut session)?;
    print_layer_table(&session);

    if cli.no_layers && cli.no_composite {
        return Ok(());
    }

    let stem = cli
        .image_path
        .file_name()
        .and_then(|s| s.to_str())
        .map_or_else(|| hachure_export::sanitize_stem(""), hachure_export::source_stem);
    let config_json = serde_json::to_string(&config)
        .map_err(|e| format!("Error serializing config: {e}"))?;
    let options = ExportOptions {
        stem: &stem,
        layer_background: cli.layer_background,
        config_json: Some(&config_json),
    };

    let mut sink = DirectorySink::create(&cli.out_dir).map_err(|e| e.to_string())?;
    let mut written = Vec::new();
    if !cli.no_layers {
        written.extend(
            hachure_export::export_visible_layers(&mut session, &options, &mut sink)
                .map_err(|e| format!("Export error: {e}"))?,
        );
    }
    if !cli.no_composite {
        written.push(
            hachure_export::export_composite(&mut session, &options, &mut sink)
                .map_err(|e| format!("Export error: {e}"))?,
        );
    }

    for name in &written {
        eprintln!("Wrote {}", cli.out_dir.join(name).display());
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

//! Rendering session layers into named SVG files.
//!
//! Segments come from the session cache, so exporting right after a
//! parameter change only re-hatches what was invalidated.

use std::sync::Arc;

use hachure_pipeline::{Rgb, Segment, Session};

use crate::color_name::nearest_named_color;
use crate::filename::{composite_filename, layer_filename};
use crate::sink::{ExportError, ExportFile, ExportSink};
use crate::svg::{
    DocumentGeometry, LayerRef, SvgMetadata, composite_svg, contrast_background, layer_svg,
};

/// Options shared by every export in a batch.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions<'a> {
    /// Sanitized source stem every filename starts with.
    pub stem: &'a str,
    /// Draw a contrasting background behind single-layer documents.
    pub layer_background: bool,
    /// Settings JSON embedded in each document's `<metadata>`.
    pub config_json: Option<&'a str>,
}

impl<'a> ExportOptions<'a> {
    /// Options with no layer background and no embedded settings.
    #[must_use]
    pub const fn new(stem: &'a str) -> Self {
        Self {
            stem,
            layer_background: false,
            config_json: None,
        }
    }
}

fn geometry(session: &Session) -> DocumentGeometry {
    DocumentGeometry {
        dimensions: session.dimensions(),
        ppi: session.ppi(),
        border_px: session.border_px(),
    }
}

fn layer_parts(
    session: &mut Session,
    layer: usize,
) -> Result<(Arc<[Segment]>, Rgb), ExportError> {
    let color = session.layer_color(layer)?;
    let segments = session.layer_segments(layer)?;
    Ok((segments, color))
}

/// Render one layer, whether visible or not.
///
/// # Errors
///
/// Returns [`ExportError::Pipeline`] if no analysis has run or `layer`
/// is out of range.
pub fn render_layer(
    session: &mut Session,
    layer: usize,
    options: &ExportOptions<'_>,
) -> Result<ExportFile, ExportError> {
    let (segments, color) = layer_parts(session, layer)?;
    let name = layer_filename(options.stem, layer, &nearest_named_color(color).slug());
    let title = name.trim_end_matches(".svg");
    let metadata = SvgMetadata {
        title: Some(title),
        description: None,
        config_json: options.config_json,
    };
    let background = options
        .layer_background
        .then(|| contrast_background(color));
    let contents = layer_svg(
        LayerRef {
            segments: &segments,
            color,
        },
        session.stroke_px(),
        &geometry(session),
        background,
        &metadata,
    );
    tracing::debug!(layer, %name, segments = segments.len(), "layer rendered");
    Ok(ExportFile::svg(name, contents))
}

/// Render every visible layer into one document, darkest first.
///
/// # Errors
///
/// Returns [`ExportError::NothingVisible`] when every layer is hidden,
/// or [`ExportError::Pipeline`] if no analysis has run.
pub fn render_composite(
    session: &mut Session,
    options: &ExportOptions<'_>,
) -> Result<ExportFile, ExportError> {
    if session.analysis().is_none() {
        return Err(hachure_pipeline::PipelineError::NotAnalyzed.into());
    }
    let visible = session.visible_layers();
    if visible.is_empty() {
        return Err(ExportError::NothingVisible);
    }

    let parts = visible
        .iter()
        .map(|&layer| layer_parts(session, layer))
        .collect::<Result<Vec<_>, _>>()?;
    let layers: Vec<LayerRef<'_>> = parts
        .iter()
        .map(|(segments, color)| LayerRef {
            segments,
            color: *color,
        })
        .collect();

    let name = composite_filename(options.stem);
    let metadata = SvgMetadata {
        title: Some(name.trim_end_matches(".svg")),
        description: None,
        config_json: options.config_json,
    };
    let contents = composite_svg(
        &layers,
        session.stroke_px(),
        &geometry(session),
        &metadata,
    );
    tracing::debug!(%name, layers = layers.len(), "composite rendered");
    Ok(ExportFile::svg(name, contents))
}

/// Render one layer and hand it to `sink`. Returns the file name.
///
/// # Errors
///
/// Propagates rendering and sink errors.
pub fn export_layer<S: ExportSink + ?Sized>(
    session: &mut Session,
    layer: usize,
    options: &ExportOptions<'_>,
    sink: &mut S,
) -> Result<String, ExportError> {
    let file = render_layer(session, layer, options)?;
    sink.write_file(&file)?;
    Ok(file.name)
}

/// Export each visible layer as its own file, in layer order.
///
/// Stops at the first failure; files already written stay written.
///
/// # Errors
///
/// Returns [`ExportError::NothingVisible`] when every layer is hidden,
/// and otherwise propagates rendering and sink errors.
pub fn export_visible_layers<S: ExportSink + ?Sized>(
    session: &mut Session,
    options: &ExportOptions<'_>,
    sink: &mut S,
) -> Result<Vec<String>, ExportError> {
    if session.analysis().is_none() {
        return Err(hachure_pipeline::PipelineError::NotAnalyzed.into());
    }
    let visible = session.visible_layers();
    if visible.is_empty() {
        return Err(ExportError::NothingVisible);
    }
    visible
        .into_iter()
        .map(|layer| export_layer(session, layer, options, sink))
        .collect()
}

/// Render the composite and hand it to `sink`. Returns the file name.
///
/// # Errors
///
/// Propagates rendering and sink errors.
pub fn export_composite<S: ExportSink + ?Sized>(
    session: &mut Session,
    options: &ExportOptions<'_>,
    sink: &mut S,
) -> Result<String, ExportError> {
    let file = render_composite(session, options)?;
    sink.write_file(&file)?;
    Ok(file.name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hachure_pipeline::{AnalysisConfig, HatchSettings, PipelineError, RgbaImage};

    use super::*;
    use crate::sink::MemorySink;

    /// Left half black, right half white.
    fn session() -> Session {
        let image = RgbaImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut session = Session::new(image);
        session.set_analysis_config(AnalysisConfig {
            requested_k: 2,
            seed: Some(3),
            ..AnalysisConfig::default()
        });
        session.set_settings(HatchSettings {
            angle: 0.0,
            spacing_mm: 25.4 / 150.0, // 2 px at 300 ppi
            ..HatchSettings::default()
        });
        session.analyze().unwrap();
        session
    }

    #[test]
    fn layer_files_are_named_after_colors() {
        let mut session = session();
        let options = ExportOptions::new("demo");
        assert_eq!(
            render_layer(&mut session, 0, &options).unwrap().name,
            "demo--layer-01-black.svg"
        );
        assert_eq!(
            render_layer(&mut session, 1, &options).unwrap().name,
            "demo--layer-02-white.svg"
        );
    }

    #[test]
    fn layer_background_is_opt_in() {
        let mut session = session();
        let plain = render_layer(&mut session, 1, &ExportOptions::new("d")).unwrap();
        assert!(!plain.contents.contains("<rect"));

        let options = ExportOptions {
            layer_background: true,
            ..ExportOptions::new("d")
        };
        let framed = render_layer(&mut session, 1, &options).unwrap();
        // White strokes get a black backdrop.
        assert!(framed.contents.contains(r##"fill="#000000""##));
    }

    #[test]
    fn title_is_file_stem() {
        let mut session = session();
        let file = render_layer(&mut session, 0, &ExportOptions::new("t")).unwrap();
        assert!(file.contents.contains("<title>t--layer-01-black</title>"));
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut session = session();
        session.set_layer_visible(0, false).unwrap();
        let mut sink = MemorySink::new();
        let names =
            export_visible_layers(&mut session, &ExportOptions::new("s"), &mut sink).unwrap();
        assert_eq!(names, ["s--layer-02-white.svg"]);
        assert_eq!(sink.files().len(), 1);
    }

    #[test]
    fn composite_only_draws_visible_layers() {
        let mut session = session();
        let both = render_composite(&mut session, &ExportOptions::new("c")).unwrap();
        assert_eq!(both.name, "c--composite.svg");
        assert_eq!(both.contents.matches("<g").count(), 2);

        session.set_layer_visible(1, false).unwrap();
        let one = render_composite(&mut session, &ExportOptions::new("c")).unwrap();
        assert_eq!(one.contents.matches("<g").count(), 1);
        assert!(one.contents.contains(r##"stroke="#000000""##));
    }

    #[test]
    fn nothing_visible_is_an_error() {
        let mut session = session();
        session.set_layer_visible(0, false).unwrap();
        session.set_layer_visible(1, false).unwrap();
        let mut sink = MemorySink::new();
        assert!(matches!(
            export_visible_layers(&mut session, &ExportOptions::new("n"), &mut sink),
            Err(ExportError::NothingVisible)
        ));
        assert!(matches!(
            export_composite(&mut session, &ExportOptions::new("n"), &mut sink),
            Err(ExportError::NothingVisible)
        ));
        assert!(sink.files().is_empty());
    }

    #[test]
    fn export_before_analysis_fails() {
        let mut session = Session::new(RgbaImage::new(4, 4));
        let mut sink = MemorySink::new();
        assert!(matches!(
            export_visible_layers(&mut session, &ExportOptions::new("x"), &mut sink),
            Err(ExportError::Pipeline(PipelineError::NotAnalyzed))
        ));
        assert!(matches!(
            render_layer(&mut session, 0, &ExportOptions::new("x")),
            Err(ExportError::Pipeline(PipelineError::NotAnalyzed))
        ));
    }

    #[test]
    fn export_reuses_cached_segments() {
        let mut session = session();
        let mut sink = MemorySink::new();
        export_visible_layers(&mut session, &ExportOptions::new("r"), &mut sink).unwrap();
        assert_eq!(session.cache().len(), 2);
        export_composite(&mut session, &ExportOptions::new("r"), &mut sink).unwrap();
        assert_eq!(session.cache().len(), 2);
        assert_eq!(sink.files().len(), 3);
    }
}

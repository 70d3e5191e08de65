//! SVG export serializer.
//!
//! Converts hatch segments into SVG documents using the [`svg`] crate
//! for document construction and XML escaping.
//!
//! The coordinate system is raw image pixels (`viewBox`), while the
//! declared `width`/`height` are physical millimetres derived from the
//! pixel density, so plotters and engravers import the drawing at its
//! intended size. Each layer becomes one `<g>` carrying the stroke color
//! and width, with one `<line>` per segment.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and a
//! `<metadata>` element with the settings JSON.
//!
//! These are pure functions with no I/O -- they return a `String`.

use svg::Document;
use svg::node::element::{Description, Element, Group, Line, Rectangle, Title};
use svg::node::{Node, Text};

use hachure_pipeline::{Dimensions, MM_PER_INCH, Rgb, Segment};

/// Composite documents are always drawn on white.
pub const COMPOSITE_BACKGROUND: Rgb = [255, 255, 255];

/// Perceived lightness at or above which a layer color counts as light.
pub const LIGHT_THRESHOLD: f64 = 186.0;

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped by the `svg`
/// crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the output file stem.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Hatch and analysis settings as JSON, emitted inside `<metadata>`
    /// wrapped in a namespaced `<hachure:settings>` element so exported
    /// files carry reproducible parameters.
    pub config_json: Option<&'a str>,
}

/// Physical framing of an exported document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentGeometry {
    /// Source image size in pixels.
    pub dimensions: Dimensions,
    /// Pixels per inch used for the millimetre size.
    pub ppi: f64,
    /// Blank border on every side, in pixels.
    pub border_px: f64,
}

impl DocumentGeometry {
    /// Document width in pixels, border included on both sides.
    #[must_use]
    pub fn total_width_px(&self) -> f64 {
        2.0f64.mul_add(self.border(), f64::from(self.dimensions.width))
    }

    /// Document height in pixels, border included on both sides.
    #[must_use]
    pub fn total_height_px(&self) -> f64 {
        2.0f64.mul_add(self.border(), f64::from(self.dimensions.height))
    }

    /// Document width in millimetres.
    #[must_use]
    pub fn width_mm(&self) -> f64 {
        self.total_width_px() / self.ppi * MM_PER_INCH
    }

    /// Document height in millimetres.
    #[must_use]
    pub fn height_mm(&self) -> f64 {
        self.total_height_px() / self.ppi * MM_PER_INCH
    }

    fn border(&self) -> f64 {
        if self.border_px.is_finite() {
            self.border_px.max(0.0)
        } else {
            0.0
        }
    }
}

/// One layer to draw: its segments and representative color.
#[derive(Debug, Clone, Copy)]
pub struct LayerRef<'a> {
    /// Hatch strokes in image pixel space.
    pub segments: &'a [Segment],
    /// Stroke color.
    pub color: Rgb,
}

/// Format a color as a lowercase `#rrggbb` code.
///
/// ```
/// assert_eq!(hachure_export::hex_color([255, 136, 0]), "#ff8800");
/// ```
#[must_use]
pub fn hex_color([r, g, b]: Rgb) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Whether a color reads as light (`0.299R + 0.587G + 0.114B >= 186`).
#[must_use]
pub fn is_light([r, g, b]: Rgb) -> bool {
    let luma = 0.114f64.mul_add(
        f64::from(b),
        0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
    );
    luma >= LIGHT_THRESHOLD
}

/// Background that keeps strokes of `color` visible: black behind light
/// colors, white behind dark ones.
#[must_use]
pub fn contrast_background(color: Rgb) -> Rgb {
    if is_light(color) {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}

/// Serialize one layer into an SVG document.
///
/// `background`, when given, is drawn as a full-size `<rect>` before
/// anything else; [`contrast_background`] picks a suitable one.
///
/// # Examples
///
/// ```
/// use hachure_export::{DocumentGeometry, LayerRef, SvgMetadata, layer_svg};
/// use hachure_pipeline::{Dimensions, Point, Segment};
///
/// let segments = [Segment::new(Point::new(1.0, 2.0), Point::new(9.5, 2.0))];
/// let geometry = DocumentGeometry {
///     dimensions: Dimensions { width: 300, height: 150 },
///     ppi: 300.0,
///     border_px: 0.0,
/// };
/// let layer = LayerRef { segments: &segments, color: [200, 30, 30] };
/// let svg = layer_svg(layer, 2.0, &geometry, None, &SvgMetadata::default());
/// assert!(svg.contains(r#"width="25.400mm""#));
/// assert!(svg.contains(r#"viewBox="0 0 300 150""#));
/// assert!(svg.contains(r##"stroke="#c81e1e""##));
/// ```
#[must_use]
pub fn layer_svg(
    layer: LayerRef<'_>,
    stroke_px: f64,
    geometry: &DocumentGeometry,
    background: Option<Rgb>,
    metadata: &SvgMetadata<'_>,
) -> String {
    render(&[layer], stroke_px, geometry, background, metadata)
}

/// Serialize several layers into one document on a white background.
///
/// Layer groups are emitted in the order given.
#[must_use]
pub fn composite_svg(
    layers: &[LayerRef<'_>],
    stroke_px: f64,
    geometry: &DocumentGeometry,
    metadata: &SvgMetadata<'_>,
) -> String {
    render(
        layers,
        stroke_px,
        geometry,
        Some(COMPOSITE_BACKGROUND),
        metadata,
    )
}

fn render(
    layers: &[LayerRef<'_>],
    stroke_px: f64,
    geometry: &DocumentGeometry,
    background: Option<Rgb>,
    metadata: &SvgMetadata<'_>,
) -> String {
    let mut doc = Document::new()
        .set("width", format!("{:.3}mm", geometry.width_mm()))
        .set("height", format!("{:.3}mm", geometry.height_mm()))
        .set(
            "viewBox",
            format!(
                "0 0 {} {}",
                geometry.total_width_px(),
                geometry.total_height_px()
            ),
        );

    if let Some(bg) = background {
        doc = doc.add(
            Rectangle::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", hex_color(bg)),
        );
    }

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut settings_el = Element::new("hachure:settings");
        settings_el.assign("xmlns:hachure", "https://hachure.dev/ns/1");
        settings_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(settings_el);
        doc = doc.add(metadata_el);
    }

    let groups = layers.iter().map(|layer| layer_group(layer, stroke_px));
    let border = geometry.border();
    if border > 0.0 {
        let offset = format!("translate({border:.2},{border:.2})");
        let frame = groups.fold(Group::new().set("transform", offset), Group::add);
        doc = doc.add(frame);
    } else {
        doc = groups.fold(doc, Document::add);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// One `<g>` of `<line>` strokes sharing a color and width.
fn layer_group(layer: &LayerRef<'_>, stroke_px: f64) -> Group {
    let group = Group::new()
        .set("stroke", hex_color(layer.color))
        .set("stroke-width", stroke_px.to_string())
        .set("stroke-linecap", "round")
        .set("stroke-linejoin", "round")
        .set("fill", "none");

    layer.segments.iter().fold(group, |g, s| {
        g.add(
            Line::new()
                .set("x1", format!("{:.2}", s.start.x))
                .set("y1", format!("{:.2}", s.start.y))
                .set("x2", format!("{:.2}", s.end.x))
                .set("y2", format!("{:.2}", s.end.y)),
        )
    })
}

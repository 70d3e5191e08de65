//! hachure-export: Pure format serializers (sans-IO)
//!
//! Converts hatched layers into SVG documents, names them, and hands
//! them to an [`ExportSink`]. Nothing here touches the filesystem.

pub mod batch;
pub mod color_name;
pub mod filename;
pub mod sink;
pub mod svg;

pub use batch::{
    ExportOptions, export_composite, export_layer, export_visible_layers, render_composite,
    render_layer,
};
pub use color_name::{NAMED_COLORS, NamedColor, nearest_named_color};
pub use filename::{composite_filename, layer_filename, sanitize_stem, slugify, source_stem};
pub use sink::{ExportError, ExportFile, ExportSink, MemorySink, SVG_MIME};
pub use svg::{
    DocumentGeometry, LayerRef, SvgMetadata, composite_svg, contrast_background, hex_color,
    is_light, layer_svg,
};

//! Integration test: encoded image bytes through analysis, hatching and
//! export into an in-memory sink.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hachure_export::{ExportOptions, MemorySink, export_composite, export_visible_layers};
use hachure_pipeline::{AnalysisConfig, Border, BorderUnit, HatchSettings, Session};

/// Red disc on a pale yellow field, 80x40 px.
fn disc_png() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(80, 40, |x, y| {
        let dx = f64::from(x) - 40.0;
        let dy = f64::from(y) - 20.0;
        if dx.hypot(dy) < 15.0 {
            image::Rgba([200, 20, 30, 255])
        } else {
            image::Rgba([250, 245, 200, 255])
        }
    });
    let mut buf = Vec::new();
    image::ImageEncoder::write_image(
        image::codecs::png::PngEncoder::new(&mut buf),
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

fn session() -> Session {
    let mut session = Session::from_bytes(&disc_png()).expect("decodes");
    session.set_analysis_config(AnalysisConfig {
        requested_k: 2,
        seed: Some(11),
        ..AnalysisConfig::default()
    });
    session.set_settings(HatchSettings {
        angle: 30.0,
        spacing_mm: 0.5,
        cross_hatch: true,
        ..HatchSettings::default()
    });
    session.analyze().expect("analysis succeeds");
    session
}

#[test]
fn exports_every_layer_and_composite() {
    let mut session = session();
    let config_json = serde_json::to_string(session.settings()).unwrap();
    let options = ExportOptions {
        config_json: Some(&config_json),
        ..ExportOptions::new("disc")
    };

    let mut sink = MemorySink::new();
    let layers = export_visible_layers(&mut session, &options, &mut sink).unwrap();
    let composite = export_composite(&mut session, &options, &mut sink).unwrap();

    assert_eq!(
        layers,
        ["disc--layer-01-fire-brick.svg", "disc--layer-02-lemon-chiffon.svg"]
    );
    assert_eq!(composite, "disc--composite.svg");
    assert_eq!(sink.files().len(), 3);

    for file in sink.files() {
        assert_eq!(file.mime, "image/svg+xml");
        assert!(file.contents.contains("<line"), "{} has no strokes", file.name);
        // 80 px at 300 ppi.
        assert!(file.contents.contains(r#"width="6.773mm""#));
        assert!(file.contents.contains("spacing_mm"));
    }

    let composite = sink.get("disc--composite.svg").unwrap();
    assert!(composite.contents.contains(r##"stroke="#c8141e""##));
    assert!(composite.contents.contains(r##"stroke="#faf5c8""##));
}

#[test]
fn border_enlarges_the_document() {
    let mut session = session();
    let mut settings = *session.settings();
    settings.border = Border {
        enabled: true,
        size: 0.5, // 150 px at 300 ppi
        unit: BorderUnit::Inches,
    };
    session.set_settings(settings);

    let mut sink = MemorySink::new();
    export_composite(&mut session, &ExportOptions::new("b"), &mut sink).unwrap();
    let svg = &sink.files()[0].contents;
    assert!(svg.contains(r#"viewBox="0 0 380 340""#));
    assert!(svg.contains(r#"transform="translate(150.00,150.00)""#));
}

#[test]
fn ppi_override_rescales_document() {
    let mut session = session();
    session.set_ppi_override(Some(600.0)).unwrap();

    let mut sink = MemorySink::new();
    export_composite(&mut session, &ExportOptions::new("p"), &mut sink).unwrap();
    let svg = &sink.files()[0].contents;
    // 80 px at 600 ppi.
    assert!(svg.contains(r#"width="3.387mm""#));
    assert!(svg.contains(r#"viewBox="0 0 80 40""#));
}

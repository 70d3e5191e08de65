//! Pipeline session: the single owner of all mutable pipeline state.
//!
//! A [`Session`] holds the decoded image, the current [`Analysis`]
//! (centers plus label map), per-layer settings, the hatch settings
//! snapshot, and the [`SegmentCache`]. Every mutation goes through
//! `&mut self` and applies its cache invalidation before returning, so
//! a later read never sees segments computed from stale state.
//!
//! Invalidation rules:
//!
//! - new analysis: replace centers and labels, reset layer settings to
//!   `k` defaults, clear the cache
//! - hatch-affecting settings change or density change: clear the cache
//! - one layer's erosion override change: drop only that layer's entries
//! - visibility and border changes: no invalidation

use std::sync::Arc;

use image::{GrayImage, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::{Analysis, analyze};
use crate::cache::{CacheKey, SegmentCache};
use crate::decode::decode_rgba;
use crate::density::detect_ppi;
use crate::diagnostics::{AnalysisDiagnostics, SystemClock};
use crate::hatch::{HatchParams, MIN_SPACING_PX, hatch};
use crate::mask::layer_mask;
use crate::quantize::label_of;
use crate::types::{
    AnalysisConfig, Center, DEFAULT_PPI, Dimensions, HatchSettings, PipelineError, Rgb, Segment,
};

/// Per-layer erosion setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErosionOverride {
    /// Use the global radius from [`HatchSettings::erosion_radius`].
    #[default]
    Inherit,
    /// Use this radius for the layer regardless of the global one.
    Radius(u32),
}

impl ErosionOverride {
    /// Effective radius given the global default.
    #[must_use]
    pub const fn resolve(self, global: u32) -> u32 {
        match self {
            Self::Inherit => global,
            Self::Radius(r) => r,
        }
    }
}

/// Mutable per-layer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Whether the layer is included in the composite and batch export.
    pub visible: bool,
    /// Erosion override for this layer.
    pub erosion: ErosionOverride,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            visible: true,
            erosion: ErosionOverride::Inherit,
        }
    }
}

/// Explicit pipeline context.
#[derive(Debug)]
pub struct Session {
    image: RgbaImage,
    detected_ppi: Option<f64>,
    ppi_override: Option<f64>,
    config: AnalysisConfig,
    settings: HatchSettings,
    analysis: Option<Analysis>,
    layers: Vec<LayerSettings>,
    cache: SegmentCache,
}

impl Session {
    /// Start a session on an already decoded image.
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            detected_ppi: None,
            ppi_override: None,
            config: AnalysisConfig::default(),
            settings: HatchSettings::default(),
            analysis: None,
            layers: Vec::new(),
            cache: SegmentCache::new(),
        }
    }

    /// Decode `bytes` and read their embedded pixel density.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] if the bytes cannot be decoded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let image = decode_rgba(bytes)?;
        let mut session = Self::new(image);
        session.detected_ppi = detect_ppi(bytes);
        tracing::debug!(
            width = session.image.width(),
            height = session.image.height(),
            ppi = ?session.detected_ppi,
            "image loaded"
        );
        Ok(session)
    }

    /// The source image.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Source image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Density read from the image metadata, if any.
    #[must_use]
    pub const fn detected_ppi(&self) -> Option<f64> {
        self.detected_ppi
    }

    /// Operative density: the override, else the detected value, else
    /// [`DEFAULT_PPI`].
    #[must_use]
    pub fn ppi(&self) -> f64 {
        self.ppi_override
            .or(self.detected_ppi)
            .unwrap_or(DEFAULT_PPI)
    }

    /// Force a density (or go back to the detected one with `None`).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a non-positive or
    /// non-finite density.
    pub fn set_ppi_override(&mut self, ppi: Option<f64>) -> Result<(), PipelineError> {
        if let Some(v) = ppi
            && !(v.is_finite() && v > 0.0)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "pixel density must be positive, got {v}"
            )));
        }
        let before = self.ppi();
        self.ppi_override = ppi;
        if self.ppi().to_bits() != before.to_bits() {
            self.cache.invalidate_all();
        }
        Ok(())
    }

    /// Analysis configuration used by the next [`analyze`](Self::analyze).
    #[must_use]
    pub const fn analysis_config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace the analysis configuration.
    ///
    /// The current analysis is kept; a different morphology backend
    /// clears the cache since masks may change.
    pub fn set_analysis_config(&mut self, config: AnalysisConfig) {
        if config.morphology != self.config.morphology {
            self.cache.invalidate_all();
        }
        self.config = config;
    }

    /// Run analysis with a random source derived from the configured
    /// seed (or the OS when unseeded).
    ///
    /// # Errors
    ///
    /// See [`analyze_with_rng`](Self::analyze_with_rng).
    pub fn analyze(&mut self) -> Result<&Analysis, PipelineError> {
        self.analyze_with_diagnostics().map(|_| ())?;
        self.analysis.as_ref().ok_or(PipelineError::NotAnalyzed)
    }

    /// Run analysis and return its per-stage diagnostics.
    ///
    /// # Errors
    ///
    /// See [`analyze_with_rng`](Self::analyze_with_rng).
    pub fn analyze_with_diagnostics(&mut self) -> Result<AnalysisDiagnostics, PipelineError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.analyze_with_rng(&mut rng)
    }

    /// Run analysis drawing randomness from `rng`.
    ///
    /// On success the new analysis replaces the old one, layer settings
    /// are reset to `k` defaults and the cache is cleared. On failure
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the pixel sample is
    /// empty.
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<AnalysisDiagnostics, PipelineError> {
        let (analysis, diagnostics) = analyze(&self.image, &self.config, rng, &SystemClock)?;
        self.commit(analysis);
        Ok(diagnostics)
    }

    fn commit(&mut self, analysis: Analysis) {
        self.layers = vec![LayerSettings::default(); analysis.layer_count()];
        self.analysis = Some(analysis);
        self.cache.invalidate_all();
    }

    /// Current analysis, if one has completed.
    #[must_use]
    pub const fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Current centers, darkest first (empty before analysis).
    #[must_use]
    pub fn centers(&self) -> &[Center] {
        self.analysis.as_ref().map_or(&[][..], Analysis::centers)
    }

    /// Number of layers in the current analysis.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Current hatch settings.
    #[must_use]
    pub const fn settings(&self) -> &HatchSettings {
        &self.settings
    }

    /// Replace the hatch settings, clearing the cache if any
    /// segment-affecting field changed.
    pub fn set_settings(&mut self, settings: HatchSettings) {
        if self.settings.affects_segments(&settings) {
            self.cache.invalidate_all();
        }
        self.settings = settings;
    }

    /// Pixel-space hatch parameters at the operative density.
    #[must_use]
    pub fn hatch_params(&self) -> HatchParams {
        self.settings.hatch_params(self.ppi())
    }

    /// Stroke width in pixels at the operative density.
    #[must_use]
    pub fn stroke_px(&self) -> f64 {
        self.settings.stroke_px(self.ppi())
    }

    /// Border width in pixels at the operative density.
    #[must_use]
    pub fn border_px(&self) -> f64 {
        self.settings.border_px(self.ppi())
    }

    fn analysis_and_layer(&self, layer: usize) -> Result<&Analysis, PipelineError> {
        let analysis = self.analysis.as_ref().ok_or(PipelineError::NotAnalyzed)?;
        if layer >= analysis.layer_count() {
            return Err(PipelineError::LayerOutOfRange {
                layer,
                count: analysis.layer_count(),
            });
        }
        Ok(analysis)
    }

    /// Settings of one layer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotAnalyzed`] before the first analysis
    /// and [`PipelineError::LayerOutOfRange`] for a bad index.
    pub fn layer_settings(&self, layer: usize) -> Result<LayerSettings, PipelineError> {
        self.analysis_and_layer(layer)?;
        Ok(self.layers[layer])
    }

    /// Include or exclude a layer from composite and batch output.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings).
    pub fn set_layer_visible(&mut self, layer: usize, visible: bool) -> Result<(), PipelineError> {
        self.analysis_and_layer(layer)?;
        self.layers[layer].visible = visible;
        Ok(())
    }

    /// Change one layer's erosion override. Only that layer's cached
    /// segments are dropped.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings).
    pub fn set_layer_erosion(
        &mut self,
        layer: usize,
        erosion: ErosionOverride,
    ) -> Result<(), PipelineError> {
        self.analysis_and_layer(layer)?;
        if self.layers[layer].erosion != erosion {
            self.layers[layer].erosion = erosion;
            self.cache.invalidate_layer(layer);
        }
        Ok(())
    }

    /// Effective opening radius for a layer.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings).
    pub fn effective_erosion(&self, layer: usize) -> Result<u32, PipelineError> {
        Ok(self
            .layer_settings(layer)?
            .erosion
            .resolve(self.settings.erosion_radius))
    }

    /// Indices of visible layers, ascending.
    #[must_use]
    pub fn visible_layers(&self) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .map(|(i, _)| i)
            .collect()
    }

    /// Rounded 8-bit color of a layer.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings).
    pub fn layer_color(&self, layer: usize) -> Result<Rgb, PipelineError> {
        let analysis = self.analysis_and_layer(layer)?;
        analysis.color(layer).ok_or(PipelineError::LayerOutOfRange {
            layer,
            count: analysis.layer_count(),
        })
    }

    /// Binary mask of a layer after invert and opening.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings).
    pub fn layer_mask(&self, layer: usize) -> Result<GrayImage, PipelineError> {
        let analysis = self.analysis_and_layer(layer)?;
        let erosion = self.effective_erosion(layer)?;
        Ok(layer_mask(
            analysis.labels(),
            label_of(layer),
            self.settings.invert,
            erosion,
            &self.config.morphology,
        ))
    }

    /// Hatch segments of a layer, served from the cache when possible.
    ///
    /// # Errors
    ///
    /// Same as [`layer_settings`](Self::layer_settings), plus
    /// [`PipelineError::InvalidConfig`] when the spacing at the operative
    /// density is below [`MIN_SPACING_PX`].
    pub fn layer_segments(&mut self, layer: usize) -> Result<Arc<[Segment]>, PipelineError> {
        let erosion = self.effective_erosion(layer)?;
        let params = self.hatch_params();
        if !(params.spacing >= MIN_SPACING_PX && params.spacing.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "hatch spacing of {} mm is {} px at {} ppi, below the {MIN_SPACING_PX} px minimum",
                self.settings.spacing_mm,
                params.spacing,
                self.ppi()
            )));
        }
        let invert = self.settings.invert;
        let backend = self.config.morphology;
        let analysis = self.analysis.as_ref().ok_or(PipelineError::NotAnalyzed)?;

        let key = CacheKey::new(layer, &params, erosion);
        Ok(self.cache.get_or_insert_with(key, || {
            let mask = layer_mask(analysis.labels(), label_of(layer), invert, erosion, &backend);
            hatch(&mask, &params)
        }))
    }

    /// The segment cache.
    #[must_use]
    pub const fn cache(&self) -> &SegmentCache {
        &self.cache
    }
}

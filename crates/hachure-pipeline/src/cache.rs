//! Memoized hatch output per layer and parameter set.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::hatch::HatchParams;
use crate::types::Segment;

/// Everything that determines one layer's segments for a fixed label map.
///
/// Floating fields compare by bit pattern, so `0.0` and `-0.0` are
/// distinct keys and a `NaN` key equals itself.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey {
    /// Zero-based layer index.
    pub layer: usize,
    /// Primary angle in degrees.
    pub angle: f64,
    /// Spacing in pixels.
    pub spacing: f64,
    /// Whether the cross pass is included.
    pub cross_hatch: bool,
    /// Cross pass angle in degrees.
    pub cross_angle: f64,
    /// Effective opening radius for this layer.
    pub erosion_radius: u32,
}

impl CacheKey {
    /// Key for `layer` hatched with `params` after opening by `erosion_radius`.
    #[must_use]
    pub const fn new(layer: usize, params: &HatchParams, erosion_radius: u32) -> Self {
        Self {
            layer,
            angle: params.angle,
            spacing: params.spacing,
            cross_hatch: params.cross_hatch,
            cross_angle: params.cross_angle,
            erosion_radius,
        }
    }

    const fn bits(&self) -> (usize, u64, u64, bool, u64, u32) {
        (
            self.layer,
            self.angle.to_bits(),
            self.spacing.to_bits(),
            self.cross_hatch,
            self.cross_angle.to_bits(),
            self.erosion_radius,
        )
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Segment sets keyed by [`CacheKey`].
///
/// Values are shared slices, so a hit hands out the stored segments
/// without copying them.
#[derive(Debug, Default)]
pub struct SegmentCache {
    entries: HashMap<CacheKey, Arc<[Segment]>>,
}

impl SegmentCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored segments for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[Segment]>> {
        self.entries.get(key).cloned()
    }

    /// Whether `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stored segments for `key`, computing and storing them on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: CacheKey, compute: F) -> Arc<[Segment]>
    where
        F: FnOnce() -> Vec<Segment>,
    {
        if let Some(hit) = self.entries.get(&key) {
            tracing::trace!(layer = key.layer, "segment cache hit");
            return Arc::clone(hit);
        }
        tracing::trace!(layer = key.layer, "segment cache miss");
        let segments: Arc<[Segment]> = compute().into();
        self.entries.insert(key, Arc::clone(&segments));
        segments
    }

    /// Drop every entry.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(entries = self.entries.len(), "segment cache cleared");
        }
        self.entries.clear();
    }

    /// Drop only the entries for `layer` and return how many went.
    pub fn invalidate_layer(&mut self, layer: usize) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.layer != layer);
        let removed = before - self.entries.len();
        tracing::debug!(layer, removed, "segment cache layer invalidated");
        removed
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Point;

    fn params(angle: f64) -> HatchParams {
        HatchParams {
            angle,
            spacing: 4.0,
            cross_hatch: false,
            cross_angle: 135.0,
        }
    }

    fn one_segment(x: f64) -> Vec<Segment> {
        vec![Segment::new(Point::new(x, 0.0), Point::new(x, 5.0))]
    }

    #[test]
    fn miss_computes_then_hit_reuses() {
        let mut cache = SegmentCache::new();
        let calls = Cell::new(0);
        let key = CacheKey::new(0, &params(45.0), 0);

        let first = cache.get_or_insert_with(key, || {
            calls.set(calls.get() + 1);
            one_segment(1.0)
        });
        let second = cache.get_or_insert_with(key, || {
            calls.set(calls.get() + 1);
            one_segment(2.0)
        });

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!((second[0].start.x - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn every_key_field_distinguishes_entries() {
        let base = CacheKey::new(1, &params(45.0), 2);
        let variants = [
            CacheKey { layer: 2, ..base },
            CacheKey { angle: 46.0, ..base },
            CacheKey {
                spacing: 4.5,
                ..base
            },
            CacheKey {
                cross_hatch: true,
                ..base
            },
            CacheKey {
                cross_angle: 90.0,
                ..base
            },
            CacheKey {
                erosion_radius: 3,
                ..base
            },
        ];
        for v in variants {
            assert_ne!(base, v);
        }
        assert_eq!(base, CacheKey::new(1, &params(45.0), 2));
    }

    #[test]
    fn nan_key_matches_itself() {
        let key = CacheKey::new(0, &params(f64::NAN), 0);
        let mut cache = SegmentCache::new();
        cache.get_or_insert_with(key, Vec::new);
        assert!(cache.contains(&key));
    }

    #[test]
    fn invalidate_layer_leaves_other_layers_intact() {
        let mut cache = SegmentCache::new();
        for layer in 0..3 {
            for angle in [0.0, 45.0] {
                let x = f64::from(u32::try_from(layer).unwrap()) + angle;
                cache.get_or_insert_with(CacheKey::new(layer, &params(angle), 0), || {
                    one_segment(x)
                });
            }
        }
        let kept = cache.get(&CacheKey::new(2, &params(45.0), 0)).unwrap();

        assert_eq!(cache.invalidate_layer(1), 2);
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(&CacheKey::new(1, &params(0.0), 0)));

        let after = cache.get(&CacheKey::new(2, &params(45.0), 0)).unwrap();
        assert!(Arc::ptr_eq(&kept, &after));
    }

    #[test]
    fn invalidate_missing_layer_is_noop() {
        let mut cache = SegmentCache::new();
        cache.get_or_insert_with(CacheKey::new(0, &params(0.0), 0), Vec::new);
        assert_eq!(cache.invalidate_layer(5), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let mut cache = SegmentCache::new();
        cache.get_or_insert_with(CacheKey::new(0, &params(0.0), 0), Vec::new);
        cache.get_or_insert_with(CacheKey::new(1, &params(0.0), 0), Vec::new);
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get(&CacheKey::new(0, &params(0.0), 0)).is_none());
    }
}

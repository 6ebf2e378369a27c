//! Channel quantization and the per-frame color lookup table
//!
//! Quantization drops the `q` low bits of each channel and snaps the value to
//! the center of its bin, so near-identical pixels share one mapping result.
//! When the full table of bins is small compared to the frame it is
//! precomputed; otherwise results are memoized as they are encountered.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::color::Rgb;

/// Highest supported quantization level (8 bins per channel).
pub const MAX_QUANT_LEVEL: u8 = 5;

/// Entries a [`ColorCache`] holds before it starts over.
pub const CACHE_LIMIT: usize = 1 << 16;

/// A precomputed table is only built when it has at most this fraction of
/// the frame's pixel count.
const TABLE_SIZE_DIVISOR: usize = 4;

/// Snap a channel to the center of its bin at quantization level `q`.
#[inline]
pub fn quantize_channel(value: u8, q: u8) -> u8 {
    if q == 0 {
        return value;
    }
    let base = ((value >> q) as u16) << q;
    (base + (1u16 << (q - 1))).min(255) as u8
}

/// Quantize all three channels.
#[inline]
pub fn quantize(color: Rgb, q: u8) -> Rgb {
    Rgb::new(
        quantize_channel(color.r, q),
        quantize_channel(color.g, q),
        quantize_channel(color.b, q),
    )
}

/// Mapping results for every bin center at one quantization level.
#[derive(Debug, Clone)]
pub struct QuantTable {
    q: u8,
    bins: usize,
    entries: Vec<Rgb>,
}

impl QuantTable {
    /// Number of entries a table at level `q` would hold.
    #[inline]
    pub fn size_for(q: u8) -> usize {
        let bins = 256usize >> q;
        bins * bins * bins
    }

    /// Whether a table pays off for a frame of `pixel_count` pixels.
    pub fn worthwhile(q: u8, pixel_count: usize) -> bool {
        q > 0 && Self::size_for(q) <= pixel_count / TABLE_SIZE_DIVISOR
    }

    /// Build the table by mapping every bin center with `map`, in parallel.
    pub fn build<F>(q: u8, map: F) -> Self
    where
        F: Fn(Rgb) -> Rgb + Sync,
    {
        let bins = 256usize >> q;
        let entries = (0..bins * bins * bins)
            .into_par_iter()
            .map(|index| {
                let b = index % bins;
                let g = (index / bins) % bins;
                let r = index / (bins * bins);
                let center = |bin: usize| quantize_channel((bin << q) as u8, q);
                map(Rgb::new(center(r), center(g), center(b)))
            })
            .collect();

        Self { q, bins, entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the mapped color for an (unquantized) input color.
    #[inline]
    pub fn get(&self, color: Rgb) -> Rgb {
        let r = (color.r >> self.q) as usize;
        let g = (color.g >> self.q) as usize;
        let b = (color.b >> self.q) as usize;
        self.entries[(r * self.bins + g) * self.bins + b]
    }
}

/// Per-worker memo of mapping results, keyed by the quantized color.
///
/// Bounded: once `limit` entries are stored the next miss clears it.
#[derive(Debug)]
pub struct ColorCache {
    entries: HashMap<Rgb, Rgb>,
    limit: usize,
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorCache {
    pub fn new() -> Self {
        Self::with_limit(CACHE_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: HashMap::with_capacity(limit.min(4096)),
            limit,
        }
    }

    #[inline]
    pub fn get_or_insert_with<F: FnOnce() -> Rgb>(&mut self, key: Rgb, compute: F) -> Rgb {
        if let Some(&hit) = self.entries.get(&key) {
            return hit;
        }
        if self.entries.len() >= self.limit {
            self.entries.clear();
        }
        let value = compute();
        self.entries.insert(key, value);
        value
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_channel_bin_centers() {
        assert_eq!(quantize_channel(0, 0), 0);
        assert_eq!(quantize_channel(200, 0), 200);
        assert_eq!(quantize_channel(0, 1), 1);
        assert_eq!(quantize_channel(1, 1), 1);
        assert_eq!(quantize_channel(0, 3), 4);
        assert_eq!(quantize_channel(7, 3), 4);
        assert_eq!(quantize_channel(8, 3), 12);
        assert_eq!(quantize_channel(255, 5), 240);
    }

    #[test]
    fn test_quantize_error_is_bounded_by_half_a_bin() {
        for q in 1..=MAX_QUANT_LEVEL {
            for v in 0..=255u8 {
                let snapped = quantize_channel(v, q) as i32;
                assert!(
                    (snapped - v as i32).abs() <= 1 << (q - 1),
                    "q={q} v={v} snapped to {snapped}"
                );
            }
        }
    }

    #[test]
    fn test_table_size_heuristic() {
        assert_eq!(QuantTable::size_for(5), 512);
        assert!(!QuantTable::worthwhile(0, 1_000_000));
        assert!(QuantTable::worthwhile(5, 2048));
        assert!(!QuantTable::worthwhile(5, 2047));
    }

    #[test]
    fn test_table_matches_direct_mapping() {
        let invert = |c: Rgb| Rgb::new(255 - c.r, 255 - c.g, 255 - c.b);
        let table = QuantTable::build(4, invert);
        assert_eq!(table.len(), 16 * 16 * 16);
        for color in [Rgb::new(0, 0, 0), Rgb::new(17, 200, 255), Rgb::new(128, 64, 3)] {
            assert_eq!(table.get(color), invert(quantize(color, 4)));
        }
    }

    #[test]
    fn test_cache_computes_once() {
        let mut cache = ColorCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_insert_with(Rgb::WHITE, || {
                calls += 1;
                Rgb::BLACK
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_stays_bounded() {
        let mut cache = ColorCache::with_limit(100);
        for v in 0..=255u8 {
            for g in [0u8, 128] {
                let key = Rgb::new(v, g, 7);
                let value = cache.get_or_insert_with(key, || Rgb::new(g, v, 1));
                assert_eq!(value, Rgb::new(g, v, 1));
                assert!(cache.len() <= 100);
            }
        }
        assert!(!cache.is_empty());

        // Every distinct input at level 0 stays within the default bound
        let mut cache = ColorCache::new();
        for i in 0..(CACHE_LIMIT as u32 + 500) {
            let key = Rgb::new((i >> 16) as u8, (i >> 8) as u8, i as u8);
            cache.get_or_insert_with(key, || Rgb::BLACK);
        }
        assert!(cache.len() <= CACHE_LIMIT);
    }
}

//! Palette lookup structure with nearest-color and weighted-blend matching.

use super::error::PaletteError;
use crate::color::{Lab, Rgb};
use crate::distance::DiffFormula;
use crate::smooth::SmoothKernel;

/// Upper bound on palette entries. One slot of an 8-bit index space is left
/// for transparency in indexed output formats.
pub const MAX_PALETTE_SIZE: usize = 255;

/// An immutable set of target colors prepared for per-pixel matching.
///
/// Duplicate entries are allowed. Lookups are linear scans, which beats any
/// spatial index at 255 entries and keeps tie-breaking trivially stable.
///
/// # Example
///
/// ```
/// use palettum_core::{DiffFormula, Lab, Palette, Rgb};
///
/// let palette = Palette::new(&[Rgb::BLACK, Rgb::WHITE]).unwrap();
/// let red = Lab::from(Rgb::new(255, 0, 0));
/// let (idx, _) = palette.find_nearest(&red, DiffFormula::Ciede2000);
/// assert_eq!(palette.color(idx), Rgb::WHITE);
/// ```
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Rgb>,
    labs: Vec<Lab>,
}

impl Palette {
    /// Create a palette from 1..=255 colors.
    pub fn new(colors: &[Rgb]) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::EmptyPalette);
        }
        if colors.len() > MAX_PALETTE_SIZE {
            return Err(PaletteError::TooManyColors {
                len: colors.len(),
                max: MAX_PALETTE_SIZE,
            });
        }

        Ok(Self {
            colors: colors.to_vec(),
            labs: colors.iter().map(|&c| Lab::from(c)).collect(),
        })
    }

    /// Create a palette from hex strings (`#RRGGBB`, `#RGB`, with or without `#`).
    pub fn from_hex(colors: &[&str]) -> Result<Self, PaletteError> {
        let parsed = colors
            .iter()
            .map(|s| s.parse::<Rgb>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&parsed)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; construction rejects empty palettes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    #[inline]
    pub fn color(&self, idx: usize) -> Rgb {
        self.colors[idx]
    }

    #[inline]
    pub fn lab(&self, idx: usize) -> Lab {
        self.labs[idx]
    }

    #[inline]
    pub fn contains(&self, color: Rgb) -> bool {
        self.colors.contains(&color)
    }

    /// Find the palette entry closest to `target` under `formula`.
    ///
    /// Returns `(index, distance)`. On ties the lowest index wins.
    #[inline]
    pub fn find_nearest(&self, target: &Lab, formula: DiffFormula) -> (usize, f64) {
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;

        for (i, lab) in self.labs.iter().enumerate() {
            let dist = formula.delta_e(target, lab);
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }

        (best_idx, best_dist)
    }

    /// Compute normalized kernel weights for every palette entry into `out`.
    ///
    /// `out` is cleared and refilled with one weight per entry; the weights
    /// sum to 1. If every weight underflows to zero the nearest entry
    /// receives the full weight.
    pub fn weights_into(
        &self,
        target: &Lab,
        formula: DiffFormula,
        kernel: &SmoothKernel,
        out: &mut Vec<f64>,
    ) {
        out.clear();
        out.extend(
            self.labs
                .iter()
                .map(|lab| kernel.weight(formula.delta_e(target, lab))),
        );

        let total: f64 = out.iter().sum();
        if total > 0.0 && total.is_finite() {
            for w in out.iter_mut() {
                *w /= total;
            }
        } else {
            let (nearest, _) = self.find_nearest(target, formula);
            for (i, w) in out.iter_mut().enumerate() {
                *w = if i == nearest { 1.0 } else { 0.0 };
            }
        }
    }

    /// Normalized kernel weights for every palette entry.
    pub fn weights(&self, target: &Lab, formula: DiffFormula, kernel: &SmoothKernel) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        self.weights_into(target, formula, kernel, &mut out);
        out
    }

    /// Blend the palette in Lab with the given normalized weights.
    ///
    /// The result is rounded and clamped back to 8-bit sRGB.
    pub fn blend(&self, weights: &[f64]) -> Rgb {
        debug_assert_eq!(weights.len(), self.labs.len());

        let mut acc = Lab::default();
        for (lab, &w) in self.labs.iter().zip(weights) {
            acc.l += w * lab.l;
            acc.a += w * lab.a;
            acc.b += w * lab.b;
        }
        acc.to_rgb()
    }
}

//! The per-pixel mapping engine
//!
//! [`Mapper`] binds a [`Palette`] to a validated set of [`MapOptions`] and
//! recolors RGBA frames in place. For each pixel:
//!
//! 1. alpha below `transparency_threshold` skips the pixel entirely
//!    (when the mode snaps to the palette its alpha is zeroed, RGB stays
//!    untouched)
//! 2. blue-noise dither perturbs the color, or diffused error is added
//! 3. quantization snaps the color to its bin center, if enabled
//! 4. the color is matched (`Palettized`), blended (`Smoothed`) or blended
//!    and then matched (`SmoothedPalettized`)
//!
//! Rows are processed in parallel on the current rayon pool. Every step is a
//! pure function of the pixel, its position and the frame index, so the
//! output does not depend on scheduling. Floyd-Steinberg is the exception:
//! it walks the frame serially in raster order.

mod quantize;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::color::{Lab, Rgb};
use crate::dither::diffusion::{ErrorBuffer, FLOYD_STEINBERG};
use crate::dither::{BlueNoise, DitherAlgorithm};
use crate::distance::DiffFormula;
use crate::error::{MapError, UnknownVariant};
use crate::palette::Palette;
use crate::smooth::{SmoothFormula, SmoothKernel};

pub use quantize::{quantize, quantize_channel, ColorCache, QuantTable, CACHE_LIMIT, MAX_QUANT_LEVEL};

/// How a source pixel is turned into an output color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mapping {
    /// Nearest palette color
    #[default]
    Palettized,
    /// Distance-weighted blend of all palette colors
    Smoothed,
    /// Smoothed blend, then the palette color nearest to it
    SmoothedPalettized,
}

impl Mapping {
    pub const ALL: [Mapping; 3] = [Self::Palettized, Self::Smoothed, Self::SmoothedPalettized];

    pub fn as_str(self) -> &'static str {
        match self {
            Mapping::Palettized => "Palettized",
            Mapping::Smoothed => "Smoothed",
            Mapping::SmoothedPalettized => "SmoothedPalettized",
        }
    }

    /// Whether every output color is a palette member. Such modes write
    /// alpha 255 and zero the alpha of skipped pixels.
    #[inline]
    pub fn snaps_to_palette(self) -> bool {
        !matches!(self, Mapping::Smoothed)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mapping {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("mapping", s))
    }
}

/// Options controlling one mapping invocation.
///
/// # Defaults
///
/// - mapping: `Palettized`
/// - diff formula: `CIEDE2000`
/// - smooth formula: `Idw`, strength 0.5
/// - transparency threshold: 128
/// - dither: `None`, strength 0.5
/// - quant level: 0 (disabled)
///
/// ```
/// use palettum_core::{DitherAlgorithm, MapOptions, Mapping};
///
/// let options = MapOptions::new()
///     .mapping(Mapping::Smoothed)
///     .dither(DitherAlgorithm::Bn, 0.25);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub mapping: Mapping,
    pub diff_formula: DiffFormula,
    pub smooth_formula: SmoothFormula,
    /// 0.0..=1.0, kernel width for `Smoothed` mapping
    pub smooth_strength: f32,
    /// Pixels with alpha strictly below this are left unmapped; 0 disables
    pub transparency_threshold: u8,
    pub dither_algorithm: DitherAlgorithm,
    /// 0.0..=1.0, linear scale of the dither perturbation
    pub dither_strength: f32,
    /// Low bits dropped per channel before matching, 0..=5
    pub quant_level: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            mapping: Mapping::Palettized,
            diff_formula: DiffFormula::Ciede2000,
            smooth_formula: SmoothFormula::Idw,
            smooth_strength: 0.5,
            transparency_threshold: 128,
            dither_algorithm: DitherAlgorithm::None,
            dither_strength: 0.5,
            quant_level: 0,
        }
    }
}

impl MapOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn diff_formula(mut self, formula: DiffFormula) -> Self {
        self.diff_formula = formula;
        self
    }

    pub fn smoothing(mut self, formula: SmoothFormula, strength: f32) -> Self {
        self.smooth_formula = formula;
        self.smooth_strength = strength;
        self
    }

    pub fn transparency_threshold(mut self, threshold: u8) -> Self {
        self.transparency_threshold = threshold;
        self
    }

    pub fn dither(mut self, algorithm: DitherAlgorithm, strength: f32) -> Self {
        self.dither_algorithm = algorithm;
        self.dither_strength = strength;
        self
    }

    pub fn quant_level(mut self, level: u8) -> Self {
        self.quant_level = level;
        self
    }

    /// Check numeric ranges. Enumerated fields are valid by construction.
    pub fn validate(&self) -> Result<(), MapError> {
        check_strength("smoothStrength", self.smooth_strength)?;
        check_strength("ditherStrength", self.dither_strength)?;
        if self.quant_level > MAX_QUANT_LEVEL {
            return Err(MapError::InvalidQuantLevel {
                value: self.quant_level,
                max: MAX_QUANT_LEVEL,
            });
        }
        Ok(())
    }
}

fn check_strength(name: &'static str, value: f32) -> Result<(), MapError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MapError::InvalidStrength { name, value })
    }
}

/// A palette bound to validated options, ready to recolor frames.
#[derive(Debug, Clone)]
pub struct Mapper {
    palette: Palette,
    options: MapOptions,
    kernel: SmoothKernel,
}

impl Mapper {
    pub fn new(palette: Palette, options: MapOptions) -> Result<Self, MapError> {
        options.validate()?;
        let kernel = SmoothKernel::new(options.smooth_formula, options.smooth_strength);
        Ok(Self {
            palette,
            options,
            kernel,
        })
    }

    /// Build the palette from raw colors; an empty slice fails with
    /// `PaletteError::EmptyPalette`.
    pub fn from_colors(colors: &[Rgb], options: MapOptions) -> Result<Self, MapError> {
        Self::new(Palette::new(colors)?, options)
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Map one opaque color, ignoring transparency, dither and quantization.
    ///
    /// `scratch` is reused for kernel weights in `Smoothed` mode.
    pub fn map_color(&self, color: Rgb, scratch: &mut Vec<f64>) -> Rgb {
        let lab = Lab::from(color);
        match self.options.mapping {
            Mapping::Palettized => {
                let (idx, _) = self.palette.find_nearest(&lab, self.options.diff_formula);
                self.palette.color(idx)
            }
            Mapping::Smoothed => {
                self.palette
                    .weights_into(&lab, self.options.diff_formula, &self.kernel, scratch);
                self.palette.blend(scratch)
            }
            Mapping::SmoothedPalettized => {
                self.palette
                    .weights_into(&lab, self.options.diff_formula, &self.kernel, scratch);
                let blended = Lab::from(self.palette.blend(scratch));
                let (idx, _) = self.palette.find_nearest(&blended, self.options.diff_formula);
                self.palette.color(idx)
            }
        }
    }

    /// Recolor a packed RGBA frame in place.
    ///
    /// `frame_index` seeds the dither pattern; pass 0 for still images.
    pub fn map_frame(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        frame_index: u64,
    ) -> Result<(), MapError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if expected != Some(pixels.len()) {
            return Err(MapError::SizeMismatch {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: pixels.len(),
            });
        }
        if pixels.is_empty() {
            return Ok(());
        }

        let q = self.options.quant_level;
        let table = QuantTable::worthwhile(q, pixels.len() / 4).then(|| {
            QuantTable::build(q, |color| self.map_color(color, &mut Vec::new()))
        });
        let row_len = width as usize * 4;

        let noise = match self.options.dither_algorithm {
            DitherAlgorithm::None => None,
            DitherAlgorithm::Bn => Some(BlueNoise::new(
                self.options.dither_strength,
                self.palette.len(),
                frame_index,
            )),
            DitherAlgorithm::FloydSteinberg => {
                let mut worker = RowWorker::new(self, table.as_ref());
                let mut errors = ErrorBuffer::new(width as usize, &FLOYD_STEINBERG);
                for row in pixels.chunks_exact_mut(row_len) {
                    worker.diffuse_row(row, &mut errors);
                    errors.advance_row();
                }
                return Ok(());
            }
        };

        pixels
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each_init(
                || RowWorker::new(self, table.as_ref()),
                |worker, (y, row)| worker.map_row(row, y, noise.as_ref()),
            );

        Ok(())
    }
}

/// Per-thread state for mapping rows: memo cache and weight scratch space.
struct RowWorker<'a> {
    mapper: &'a Mapper,
    table: Option<&'a QuantTable>,
    cache: ColorCache,
    scratch: Vec<f64>,
}

impl<'a> RowWorker<'a> {
    fn new(mapper: &'a Mapper, table: Option<&'a QuantTable>) -> Self {
        Self {
            mapper,
            table,
            cache: ColorCache::new(),
            scratch: Vec::with_capacity(mapper.palette.len()),
        }
    }

    fn map_row(&mut self, row: &mut [u8], y: usize, noise: Option<&BlueNoise>) {
        let options = &self.mapper.options;
        let threshold = options.transparency_threshold;
        let palettized = options.mapping.snaps_to_palette();

        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let alpha = px[3];
            if alpha < threshold {
                if palettized {
                    px[3] = 0;
                }
                continue;
            }

            let mut color = Rgb::from_slice(px);
            if let Some(noise) = noise {
                color = noise.perturb(color, x, y);
            }
            let mapped = self.resolve(color);

            px[0] = mapped.r;
            px[1] = mapped.g;
            px[2] = mapped.b;
            px[3] = if palettized { 255 } else { alpha };
        }
    }

    /// Map one row, adding diffused error to each pixel and pushing the new
    /// error onward. Skipped pixels neither take nor pass on error.
    fn diffuse_row(&mut self, row: &mut [u8], errors: &mut ErrorBuffer) {
        let options = &self.mapper.options;
        let threshold = options.transparency_threshold;
        let palettized = options.mapping.snaps_to_palette();
        let strength = options.dither_strength;

        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let alpha = px[3];
            if alpha < threshold {
                if palettized {
                    px[3] = 0;
                }
                continue;
            }

            let carried = errors.accumulated(x);
            let adjusted: [f32; 3] =
                std::array::from_fn(|c| (px[c] as f32 + carried[c] * strength).clamp(0.0, 255.0));
            let color = Rgb::new(
                adjusted[0].round() as u8,
                adjusted[1].round() as u8,
                adjusted[2].round() as u8,
            );
            let mapped = self.resolve(color);

            let error = [
                adjusted[0] - mapped.r as f32,
                adjusted[1] - mapped.g as f32,
                adjusted[2] - mapped.b as f32,
            ];
            errors.diffuse(x, error, &FLOYD_STEINBERG);

            px[0] = mapped.r;
            px[1] = mapped.g;
            px[2] = mapped.b;
            px[3] = if palettized { 255 } else { alpha };
        }
    }

    #[inline]
    fn resolve(&mut self, color: Rgb) -> Rgb {
        if let Some(table) = self.table {
            return table.get(color);
        }
        let key = quantize(color, self.mapper.options.quant_level);
        let mapper = self.mapper;
        let scratch = &mut self.scratch;
        self.cache
            .get_or_insert_with(key, || mapper.map_color(key, scratch))
    }
}

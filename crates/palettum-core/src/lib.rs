#![allow(
    clippy::excessive_precision,
    clippy::module_inception,
    clippy::manual_range_contains
)]

//! palettum-core: perceptual palette mapping for RGBA pixel buffers
//!
//! Every pixel of an image is replaced by a color derived from a user
//! palette. Matching happens in CIE Lab with one of three color difference
//! formulas, and the result is either the single nearest palette color or a
//! distance-weighted blend of all of them.
//!
//! # Quick Start
//!
//! ```
//! use palettum_core::{MapOptions, Mapper, Rgb};
//!
//! let mapper = Mapper::from_colors(&[Rgb::BLACK, Rgb::WHITE], MapOptions::default()).unwrap();
//!
//! let mut pixels = vec![255, 0, 0, 255].repeat(4);
//! mapper.map_frame(&mut pixels, 2, 2, 0).unwrap();
//! assert_eq!(&pixels[..4], &[255, 255, 255, 255]);
//! ```
//!
//! # Mapping Modes
//!
//! - [`Mapping::Palettized`]: each opaque pixel becomes its nearest palette
//!   color with alpha 255.
//! - [`Mapping::Smoothed`]: each opaque pixel becomes a blend of all palette
//!   colors, weighted by a [`SmoothKernel`] over the color distances. Source
//!   alpha is kept.
//! - [`Mapping::SmoothedPalettized`]: the smoothed blend is matched to its
//!   nearest palette color, alpha 255.
//!
//! Pixels with alpha below the transparency threshold are not matched.
//!
//! # Color Difference
//!
//! | Formula | Notes |
//! |---------|-------|
//! | [`DiffFormula::Cie76`] | Euclidean distance in Lab |
//! | [`DiffFormula::Cie94`] | Graphic-arts weights |
//! | [`DiffFormula::Ciede2000`] | Default, most perceptually uniform |
//!
//! # Throughput
//!
//! Frames are processed row-parallel with rayon. An optional quantization
//! level snaps input channels to bin centers so that matches can be shared
//! through a precomputed table or a per-worker memo.
//!
//! # Extraction
//!
//! [`Extractor`] derives a palette from an image with seeded, weighted
//! k-means in Lab.

pub mod color;
pub mod distance;
pub mod dither;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod palette;
pub mod smooth;


pub use color::{Lab, Rgb};
pub use distance::DiffFormula;
pub use dither::{BlueNoise, DitherAlgorithm};
pub use error::{ExtractError, MapError, UnknownVariant};
pub use extract::Extractor;
pub use mapping::{MapOptions, Mapper, Mapping, MAX_QUANT_LEVEL};
pub use palette::{Palette, PaletteError, ParseColorError, MAX_PALETTE_SIZE};
pub use smooth::{SmoothFormula, SmoothKernel};

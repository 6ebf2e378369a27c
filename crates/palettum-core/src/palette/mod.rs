//! Palette types and lookup
//!
//! A [`Palette`] precomputes the Lab form of every entry once, then answers
//! nearest-color and weighted-blend queries per pixel.

mod error;
mod palette;

pub use error::{PaletteError, ParseColorError};
pub use palette::{Palette, MAX_PALETTE_SIZE};

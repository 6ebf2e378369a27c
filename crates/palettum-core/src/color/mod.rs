//! Color types and conversion utilities
//!
//! - [`Rgb`]: 8-bit sRGB, used for pixels and palette entries.
//! - [`Lab`]: CIE L*a*b* (D65), used for every distance and blend.
//!
//! ```
//! use palettum_core::{Lab, Rgb};
//!
//! let lab = Lab::from(Rgb::new(255, 0, 0));
//! assert_eq!(lab.to_rgb(), Rgb::new(255, 0, 0));
//! ```

mod lab;
mod lut;
mod rgb;

pub use lab::Lab;
pub use rgb::Rgb;

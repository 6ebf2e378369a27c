//! Error types for mapping and extraction

use std::fmt;

use crate::palette::PaletteError;

/// A configuration string that names none of the known variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// The configuration axis, e.g. `diffFormula`
    pub field: &'static str,
    /// The rejected input
    pub value: String,
}

impl UnknownVariant {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value '{}'", self.field, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Error type for the mapping engine.
///
/// Every variant except [`MapError::SizeMismatch`] is a precondition failure
/// detected before any pixel is touched.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// The palette is empty or too large
    Palette(PaletteError),
    /// Pixel buffer length differs from width * height * 4
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    /// A strength parameter is outside 0.0..=1.0 or not finite
    InvalidStrength { name: &'static str, value: f32 },
    /// Quantization level above the supported maximum
    InvalidQuantLevel { value: u8, max: u8 },
}

impl From<PaletteError> for MapError {
    fn from(err: PaletteError) -> Self {
        MapError::Palette(err)
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Palette(err) => write!(f, "{}", err),
            MapError::SizeMismatch {
                width,
                height,
                expected,
                actual,
            } => write!(
                f,
                "pixel buffer for {}x{} must be {} bytes, got {}",
                width, height, expected, actual
            ),
            MapError::InvalidStrength { name, value } => {
                write!(f, "{} must be between 0.0 and 1.0, got {}", name, value)
            }
            MapError::InvalidQuantLevel { value, max } => write!(
                f,
                "quantLevel must be between 0 (disabled) and {}, got {}",
                max, value
            ),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Palette(err) => Some(err),
            _ => None,
        }
    }
}

/// Error type for palette extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Requested color count outside 1..=max
    InvalidColorCount { requested: usize, max: usize },
    /// Pixel buffer length differs from width * height * 4
    SizeMismatch { expected: usize, actual: usize },
    /// No pixels to sample from
    EmptyImage,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::InvalidColorCount { requested, max } => write!(
                f,
                "color count must be between 1 and {}, got {}",
                max, requested
            ),
            ExtractError::SizeMismatch { expected, actual } => write!(
                f,
                "pixel buffer must be {} bytes, got {}",
                expected, actual
            ),
            ExtractError::EmptyImage => write!(f, "image has no pixels"),
        }
    }
}

impl std::error::Error for ExtractError {}

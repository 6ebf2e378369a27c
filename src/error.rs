use palettum_core::{ExtractError, MapError, PaletteError, UnknownVariant};
use thiserror::Error;

/// Problems with the media or pixel data handed in by the caller.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Unsupported media format")]
    UnsupportedFormat,

    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("Pixel buffer for {width}x{height} must be {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Media contains no frames")]
    EmptyMedia,

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Configuration rejected before any pixel work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Palette cannot be empty")]
    EmptyPalette,

    #[error("Palette has {len} colors, at most {max} are allowed")]
    PaletteTooLarge { len: usize, max: usize },

    #[error("Invalid palette: {0}")]
    InvalidPalette(String),

    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: String },

    #[error("Color count must be between 1 and {max}, got {requested}")]
    InvalidColorCount { requested: usize, max: usize },

    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Palette not found: {0}")]
    PaletteNotFound(String),

    #[error("Cannot override default palette '{0}'")]
    DefaultPalette(String),

    #[error("Custom palette '{0}' already exists, use force to overwrite")]
    PaletteExists(String),
}

/// Limits and failures of the machine rather than of the input.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Image too large: {width}x{height} (max {max_pixels} pixels)")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PalettumError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PalettumError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PalettumError::Cancelled)
    }
}

impl From<PaletteError> for ConfigError {
    fn from(e: PaletteError) -> Self {
        match e {
            PaletteError::EmptyPalette => ConfigError::EmptyPalette,
            PaletteError::TooManyColors { len, max } => ConfigError::PaletteTooLarge { len, max },
            PaletteError::ParseColor(e) => ConfigError::InvalidPalette(e.to_string()),
        }
    }
}

impl From<MapError> for PalettumError {
    fn from(e: MapError) -> Self {
        match e {
            MapError::SizeMismatch {
                width,
                height,
                expected,
                actual,
            } => InputError::SizeMismatch {
                width,
                height,
                expected,
                actual,
            }
            .into(),
            MapError::Palette(e) => ConfigError::from(e).into(),
            MapError::InvalidStrength { name, value } => ConfigError::OutOfRange {
                name,
                value: value.to_string(),
            }
            .into(),
            MapError::InvalidQuantLevel { value, .. } => ConfigError::OutOfRange {
                name: "quantLevel",
                value: value.to_string(),
            }
            .into(),
        }
    }
}

impl From<ExtractError> for PalettumError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::InvalidColorCount { requested, max } => {
                ConfigError::InvalidColorCount { requested, max }.into()
            }
            ExtractError::SizeMismatch { expected, actual } => InputError::Decode(format!(
                "pixel buffer must be {expected} bytes, got {actual}"
            ))
            .into(),
            ExtractError::EmptyImage => InputError::EmptyMedia.into(),
        }
    }
}

impl From<UnknownVariant> for PalettumError {
    fn from(e: UnknownVariant) -> Self {
        ConfigError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_size_mismatch() {
        let error = InputError::SizeMismatch {
            width: 2,
            height: 2,
            expected: 16,
            actual: 12,
        };
        assert_eq!(
            error.to_string(),
            "Pixel buffer for 2x2 must be 16 bytes, got 12"
        );
    }

    #[test]
    fn test_input_error_invalid_state() {
        let error = InputError::InvalidState {
            operation: "preview",
            state: "unloaded",
        };
        assert_eq!(error.to_string(), "Cannot preview while session is unloaded");
    }

    #[test]
    fn test_config_error_unknown_variant() {
        let error = ConfigError::from(UnknownVariant::new("mapping", "Blend"));
        assert_eq!(error.to_string(), "unknown mapping value 'Blend'");
    }

    #[test]
    fn test_resource_error_too_large() {
        let error = ResourceError::TooLarge {
            width: 20000,
            height: 20000,
            max_pixels: 100_000_000,
        };
        assert_eq!(
            error.to_string(),
            "Image too large: 20000x20000 (max 100000000 pixels)"
        );
    }

    #[test]
    fn test_map_error_size_mismatch_is_input() {
        let error: PalettumError = MapError::SizeMismatch {
            width: 1,
            height: 1,
            expected: 4,
            actual: 3,
        }
        .into();
        match error {
            PalettumError::Input(InputError::SizeMismatch { expected, actual, .. }) => {
                assert_eq!((expected, actual), (4, 3));
            }
            other => panic!("Expected Input variant, got {other:?}"),
        }
    }

    #[test]
    fn test_map_error_empty_palette_is_config() {
        let error: PalettumError = MapError::Palette(PaletteError::EmptyPalette).into();
        assert!(matches!(
            error,
            PalettumError::Config(ConfigError::EmptyPalette)
        ));
    }

    #[test]
    fn test_map_error_strength_is_config() {
        let error: PalettumError = MapError::InvalidStrength {
            name: "ditherStrength",
            value: 1.5,
        }
        .into();
        assert_eq!(error.to_string(), "ditherStrength is out of range: 1.5");
    }

    #[test]
    fn test_extract_error_mapping() {
        let error: PalettumError = ExtractError::InvalidColorCount {
            requested: 0,
            max: 255,
        }
        .into();
        assert!(matches!(
            error,
            PalettumError::Config(ConfigError::InvalidColorCount { requested: 0, .. })
        ));

        let error: PalettumError = ExtractError::EmptyImage.into();
        assert!(matches!(error, PalettumError::Input(InputError::EmptyMedia)));
    }

    #[test]
    fn test_cancelled() {
        assert!(PalettumError::Cancelled.is_cancelled());
        assert_eq!(PalettumError::Cancelled.to_string(), "Operation cancelled");
    }
}

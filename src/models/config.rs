use std::fmt;
use std::path::Path;
use std::str::FromStr;

use palettum_core::{
    DiffFormula, DitherAlgorithm, MapOptions, Mapping, SmoothFormula, UnknownVariant,
};
use serde::{Deserialize, Serialize};

use super::PaletteRecord;
use crate::error::{ConfigError, PalettumError};

/// Resampling filter used when a resize is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Filter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::Nearest => "Nearest",
            Filter::Triangle => "Triangle",
            Filter::CatmullRom => "CatmullRom",
            Filter::Gaussian => "Gaussian",
            Filter::Lanczos3 => "Lanczos3",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("filter", s))
    }
}

/// Full parameter set for one mapping invocation.
///
/// Serialized with camelCase keys; every enumerated field is closed and
/// unknown values fail to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub palette: PaletteRecord,
    pub mapping: Mapping,
    pub diff_formula: DiffFormula,
    pub smooth_formula: SmoothFormula,
    pub smooth_strength: f32,
    pub transparency_threshold: u8,
    pub dither_algorithm: DitherAlgorithm,
    pub dither_strength: f32,
    pub quant_level: u8,
    pub filter: Filter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_scale: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        let options = MapOptions::default();
        Self {
            palette: PaletteRecord::default(),
            mapping: options.mapping,
            diff_formula: options.diff_formula,
            smooth_formula: options.smooth_formula,
            smooth_strength: options.smooth_strength,
            transparency_threshold: options.transparency_threshold,
            dither_algorithm: options.dither_algorithm,
            dither_strength: options.dither_strength,
            quant_level: options.quant_level,
            filter: Filter::Nearest,
            resize_width: None,
            resize_height: None,
            resize_scale: None,
        }
    }
}

impl Config {
    pub fn new(palette: PaletteRecord) -> Self {
        Self {
            palette,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a `.json` file, anything else is read as YAML.
    pub fn from_path(path: &Path) -> Result<Self, PalettumError> {
        let content = std::fs::read_to_string(path).map_err(crate::error::ResourceError::Io)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        tracing::info!(
            path = %path.display(),
            palette = %config.palette.id,
            colors = config.palette.colors.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Engine options derived from this config.
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            mapping: self.mapping,
            diff_formula: self.diff_formula,
            smooth_formula: self.smooth_formula,
            smooth_strength: self.smooth_strength,
            transparency_threshold: self.transparency_threshold,
            dither_algorithm: self.dither_algorithm,
            dither_strength: self.dither_strength,
            quant_level: self.quant_level,
        }
    }

    /// Whether any resize parameter is set.
    pub fn wants_resize(&self) -> bool {
        self.resize_width.is_some() || self.resize_height.is_some() || self.resize_scale.is_some()
    }

    /// Reject the config before any pixel is processed.
    pub fn validate(&self) -> Result<(), PalettumError> {
        self.palette.validate()?;
        self.map_options().validate()?;

        for (name, side) in [
            ("resizeWidth", self.resize_width),
            ("resizeHeight", self.resize_height),
        ] {
            if side == Some(0) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: "0".into(),
                }
                .into());
            }
        }
        if let Some(scale) = self.resize_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    name: "resizeScale",
                    value: scale.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

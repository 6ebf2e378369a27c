use palettum_core::{Palette, Rgb, MAX_PALETTE_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest accepted palette id.
pub const MAX_ID_LEN: usize = 64;

/// Where a palette record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaletteKind {
    /// Shipped with the binary
    Default,
    /// User supplied or extracted
    #[default]
    Custom,
}

/// A named palette as persisted by callers: `{id, colors: [{r,g,b}], source?}`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaletteRecord {
    pub id: String,
    pub colors: Vec<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing)]
    pub kind: PaletteKind,
}

impl PaletteRecord {
    pub fn new(id: impl Into<String>, colors: Vec<Rgb>) -> Self {
        Self {
            id: id.into(),
            colors,
            source: None,
            kind: PaletteKind::Custom,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check id and color count. Color checks come first so that a missing
    /// palette reports as empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if self.colors.len() > MAX_PALETTE_SIZE {
            return Err(ConfigError::PaletteTooLarge {
                len: self.colors.len(),
                max: MAX_PALETTE_SIZE,
            });
        }
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidPalette("id cannot be empty".into()));
        }
        if self.id.chars().count() > MAX_ID_LEN {
            return Err(ConfigError::InvalidPalette(format!(
                "id is longer than {MAX_ID_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Build the lookup structure used by the mapper.
    pub fn to_palette(&self) -> Result<Palette, ConfigError> {
        self.validate()?;
        Ok(Palette::new(&self.colors)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_shape() {
        let record = PaletteRecord::new("duo", vec![Rgb::BLACK, Rgb::new(255, 0, 16)])
            .with_source("https://example.com");
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "duo",
                "colors": [{"r": 0, "g": 0, "b": 0}, {"r": 255, "g": 0, "b": 16}],
                "source": "https://example.com"
            })
        );
    }

    #[test]
    fn test_parse_defaults_to_custom() {
        let record =
            PaletteRecord::from_json(r##"{"id": "x", "colors": [{"r": 1, "g": 2, "b": 3}, "#fff"]}"##)
                .unwrap();
        assert_eq!(record.kind, PaletteKind::Custom);
        assert_eq!(record.source, None);
        assert_eq!(record.colors, vec![Rgb::new(1, 2, 3), Rgb::WHITE]);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            PaletteRecord::new("empty", vec![]).validate(),
            Err(ConfigError::EmptyPalette)
        ));
        assert!(matches!(
            PaletteRecord::new("big", vec![Rgb::BLACK; 256]).validate(),
            Err(ConfigError::PaletteTooLarge { len: 256, max: 255 })
        ));
        assert!(matches!(
            PaletteRecord::new("  ", vec![Rgb::BLACK]).validate(),
            Err(ConfigError::InvalidPalette(_))
        ));
        assert!(matches!(
            PaletteRecord::new("a".repeat(65), vec![Rgb::BLACK]).validate(),
            Err(ConfigError::InvalidPalette(_))
        ));
        assert!(PaletteRecord::new("a".repeat(64), vec![Rgb::BLACK; 255])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_to_palette() {
        let palette = PaletteRecord::new("bw", vec![Rgb::BLACK, Rgb::WHITE])
            .to_palette()
            .unwrap();
        assert_eq!(palette.colors(), &[Rgb::BLACK, Rgb::WHITE]);
    }
}

//! Palettum - recolor images and animations to a custom palette
//!
//! The pixel engine lives in `palettum-core`; this crate adds media
//! decode/encode, configuration records, the palette catalog and the frame
//! session used by hosts and the CLI.

pub mod assets;
pub mod engine;
pub mod error;
pub mod media;
pub mod models;
pub mod services;

pub use engine::{Engine, EngineOptions};
pub use error::{ConfigError, InputError, PalettumError, ResourceError};
pub use models::{Config, Filter, PaletteKind, PaletteRecord};
pub use services::{palette_from_media, palettify, CancelToken, Progress, Session, SessionState};

pub use palettum_core::{DiffFormula, DitherAlgorithm, Mapping, Rgb, SmoothFormula};

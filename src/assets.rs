//! Palette catalog with embedded defaults
//!
//! Default palettes are compiled into the binary from `palettes/*.json`.
//! When `PALETTES_DIR` is set, `*.json` files in that directory are merged in
//! as custom palettes:
//!
//! - If the env var is NOT set: embedded palettes only (no filesystem access)
//! - If it IS set: embedded palettes plus every valid file in the directory
//! - A custom palette may not reuse the id of a default one
//!
//! Custom palettes are saved to and removed from that directory (or
//! `./palettes` when unset) as `<id>.json`.

use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, PalettumError, ResourceError};
use crate::models::{PaletteKind, PaletteRecord};

/// Env var naming the custom palette directory
pub const PALETTES_DIR_ENV: &str = "PALETTES_DIR";

/// Embedded default palettes
#[derive(RustEmbed)]
#[folder = "palettes/"]
#[include = "*.json"]
struct EmbeddedPalettes;

/// Report of init (extraction) operations
#[derive(Debug, Default)]
pub struct InitReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

/// Palettes by id, defaults first in precedence
#[derive(Debug, Default)]
pub struct PaletteCatalog {
    palettes: BTreeMap<String, PaletteRecord>,
    custom_dir: Option<PathBuf>,
    /// Backing file of each custom palette read from or written to disk
    custom_paths: BTreeMap<String, PathBuf>,
}

impl PaletteCatalog {
    /// Catalog of the embedded defaults only.
    pub fn embedded() -> Self {
        let mut palettes = BTreeMap::new();
        for file in EmbeddedPalettes::iter() {
            let Some(data) = EmbeddedPalettes::get(&file) else {
                continue;
            };
            match parse_record(&data.data) {
                Ok(mut record) => {
                    record.kind = PaletteKind::Default;
                    tracing::trace!(id = %record.id, "Loaded embedded palette");
                    palettes.insert(record.id.clone(), record);
                }
                Err(e) => tracing::warn!(file = %file, %e, "Skipping invalid embedded palette"),
            }
        }
        Self {
            palettes,
            custom_dir: None,
            custom_paths: BTreeMap::new(),
        }
    }

    /// Embedded defaults merged with the palettes in `custom_dir`, if given.
    pub fn load(custom_dir: Option<PathBuf>) -> Self {
        let mut catalog = Self::embedded();
        if let Some(dir) = custom_dir {
            match catalog.load_dir(&dir) {
                Ok(count) => {
                    tracing::info!(dir = %dir.display(), count, "Loaded custom palettes")
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), %e, "Failed to read palettes directory")
                }
            }
            catalog.custom_dir = Some(dir);
        }
        catalog
    }

    /// Like [`PaletteCatalog::load`], with the directory from `PALETTES_DIR`.
    pub fn from_env() -> Self {
        Self::load(std::env::var(PALETTES_DIR_ENV).ok().map(PathBuf::from))
    }

    fn load_dir(&mut self, dir: &Path) -> io::Result<usize> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            let record = fs::read(&path)
                .map_err(|e| ConfigError::InvalidPalette(e.to_string()))
                .and_then(|data| parse_record(&data));
            let inserted = record.and_then(|record| {
                let id = record.id.clone();
                self.insert(record).map(|()| id)
            });
            match inserted {
                Ok(id) => {
                    self.custom_paths.insert(id, path);
                    count += 1;
                }
                Err(e) => tracing::warn!(path = %path.display(), %e, "Skipping custom palette"),
            }
        }
        Ok(count)
    }

    /// Add a custom palette. Fails if it is invalid or would shadow a
    /// default palette.
    pub fn insert(&mut self, mut record: PaletteRecord) -> Result<(), ConfigError> {
        record.validate()?;
        if let Some(existing) = self.palettes.get(&record.id) {
            if existing.kind == PaletteKind::Default {
                return Err(ConfigError::DefaultPalette(record.id));
            }
        }
        record.kind = PaletteKind::Custom;
        self.palettes.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&PaletteRecord> {
        self.palettes.get(id)
    }

    /// Look up `id`, failing with `ConfigError::PaletteNotFound`.
    pub fn require(&self, id: &str) -> Result<&PaletteRecord, ConfigError> {
        self.get(id)
            .ok_or_else(|| ConfigError::PaletteNotFound(id.to_string()))
    }

    /// All palettes ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &PaletteRecord> {
        self.palettes.values()
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// Directory custom palettes are written to.
    pub fn target_dir(&self) -> PathBuf {
        self.custom_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./palettes"))
    }

    /// Persist a custom palette as `<id>.json` and add it to the catalog.
    ///
    /// Default ids are never replaced. An existing custom palette (or file)
    /// with the same id is only replaced with `force`.
    pub fn save(&mut self, record: PaletteRecord, force: bool) -> Result<PathBuf, PalettumError> {
        record.validate()?;
        check_file_id(&record.id)?;
        match self.palettes.get(&record.id).map(|r| r.kind) {
            Some(PaletteKind::Default) => {
                return Err(ConfigError::DefaultPalette(record.id).into());
            }
            Some(PaletteKind::Custom) if !force => {
                return Err(ConfigError::PaletteExists(record.id).into());
            }
            _ => {}
        }

        let path = match self.custom_paths.get(&record.id) {
            Some(path) => path.clone(),
            None => self.target_dir().join(format!("{}.json", record.id)),
        };
        if !force && path.exists() {
            return Err(ConfigError::PaletteExists(record.id).into());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(ResourceError::Io)?;
        }
        fs::write(&path, format!("{}\n", record.to_json()?)).map_err(ResourceError::Io)?;
        tracing::info!(id = %record.id, path = %path.display(), "Saved custom palette");

        self.custom_paths.insert(record.id.clone(), path.clone());
        self.insert(record)?;
        Ok(path)
    }

    /// Drop a custom palette and delete its file. Returns the deleted path,
    /// if the palette had one.
    pub fn remove(&mut self, id: &str) -> Result<Option<PathBuf>, PalettumError> {
        match self.palettes.get(id).map(|r| r.kind) {
            None => return Err(ConfigError::PaletteNotFound(id.to_string()).into()),
            Some(PaletteKind::Default) => {
                return Err(ConfigError::DefaultPalette(id.to_string()).into());
            }
            Some(PaletteKind::Custom) => {}
        }

        let path = self.custom_paths.remove(id);
        if let Some(path) = &path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ResourceError::Io(e).into()),
            }
        }
        self.palettes.remove(id);
        tracing::info!(id, "Removed custom palette");
        Ok(path)
    }

    /// Write the embedded palettes into the custom directory (or
    /// `./palettes`) for editing.
    pub fn init(&self, force: bool) -> io::Result<InitReport> {
        let dir = self.target_dir();
        fs::create_dir_all(&dir)?;

        let mut report = InitReport::default();
        for file in EmbeddedPalettes::iter() {
            let path = dir.join(file.as_ref());
            if !force && path.exists() {
                report.skipped.push(path.display().to_string());
                continue;
            }
            if let Some(data) = EmbeddedPalettes::get(&file) {
                fs::write(&path, &*data.data)?;
                report.written.push(path.display().to_string());
            }
        }
        Ok(report)
    }

    /// Names of the embedded palette files
    pub fn list_embedded() -> Vec<String> {
        let mut files: Vec<String> = EmbeddedPalettes::iter().map(|s| s.to_string()).collect();
        files.sort();
        files
    }
}

/// Ids become file names; reject anything that would leave the directory.
fn check_file_id(id: &str) -> Result<(), ConfigError> {
    let bad = id.starts_with('.')
        || id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if bad {
        return Err(ConfigError::InvalidPalette(format!(
            "'{id}' cannot be used as a file name"
        )));
    }
    Ok(())
}

fn parse_record(data: &[u8]) -> Result<PaletteRecord, ConfigError> {
    let record: PaletteRecord =
        serde_json::from_slice(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
    record.validate()?;
    Ok(record)
}

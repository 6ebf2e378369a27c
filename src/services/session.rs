//! Frame session bound to one media source
//!
//! ```text
//! Unloaded --load--> Loaded --configure--> Reconfigured <--> Previewing
//!                      ^                        |               |
//!                      +-------- export --------+---------------+
//! any --dispose--> Disposed
//! ```
//!
//! A session owns exactly one source buffer. `set_frame` feeds decoded video
//! frames in arrival order; each call advances the dither frame index.

use std::fmt;

use palettum_core::Mapper;

use super::pipeline::{self, CancelToken, Output, Progress};
use crate::engine::Engine;
use crate::error::{ConfigError, InputError, PalettumError};
use crate::media::{Frame, Media};
use crate::models::{Config, PaletteRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loaded,
    Previewing,
    Reconfigured,
    Exporting,
    Disposed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loaded => "loaded",
            SessionState::Previewing => "previewing",
            SessionState::Reconfigured => "reconfigured",
            SessionState::Exporting => "exporting",
            SessionState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Source {
    Media(Media),
    /// Latest frame pushed by the host and its dither index
    Video { frame: Frame, index: u64 },
}

pub struct Session<'e> {
    engine: &'e Engine,
    state: SessionState,
    source: Option<Source>,
    config: Option<Config>,
    mapper: Option<Mapper>,
    cursor: usize,
}

impl<'e> Session<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            state: SessionState::Unloaded,
            source: None,
            config: None,
            mapper: None,
            cursor: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Canvas size of the loaded source.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(|source| match source {
            Source::Media(media) => media.dimensions(),
            Source::Video { frame, .. } => (frame.width(), frame.height()),
        })
    }

    pub fn frame_count(&self) -> usize {
        match &self.source {
            Some(Source::Media(media)) => media.frames().len(),
            Some(Source::Video { .. }) => 1,
            None => 0,
        }
    }

    /// File extension of what `export` produces for the loaded source.
    pub fn output_kind(&self) -> Option<&'static str> {
        match &self.source {
            Some(Source::Media(media)) => Some(Output::for_media(media).extension()),
            Some(Source::Video { .. }) => Some(Output::Png.extension()),
            None => None,
        }
    }

    /// Dither index of the most recent video frame.
    pub fn frame_index(&self) -> Option<u64> {
        match &self.source {
            Some(Source::Video { index, .. }) => Some(*index),
            _ => None,
        }
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), InputError> {
        match self.state {
            SessionState::Disposed | SessionState::Exporting => Err(InputError::InvalidState {
                operation,
                state: self.state.as_str(),
            }),
            _ => Ok(()),
        }
    }

    fn ensure_loaded(&self, operation: &'static str) -> Result<(), InputError> {
        self.ensure_open(operation)?;
        if self.source.is_none() {
            return Err(InputError::InvalidState {
                operation,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn replace_source(&mut self, source: Source) -> Result<(), PalettumError> {
        let (width, height) = match &source {
            Source::Media(media) => media.dimensions(),
            Source::Video { frame, .. } => (frame.width(), frame.height()),
        };
        self.engine.check_dimensions(width, height)?;
        self.source = Some(source);
        self.cursor = 0;
        self.state = if self.config.is_some() {
            SessionState::Reconfigured
        } else {
            SessionState::Loaded
        };
        Ok(())
    }

    /// Decode encoded media and make it the active source.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), PalettumError> {
        self.ensure_open("load")?;
        let media = Media::decode(bytes)?;
        tracing::debug!(frames = media.frames().len(), "Session loaded media");
        self.replace_source(Source::Media(media))
    }

    /// Make a packed RGBA bitmap the active source.
    pub fn load_bitmap(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<(), PalettumError> {
        self.ensure_open("load")?;
        let frame = Frame::from_rgba(width, height, rgba)?;
        self.replace_source(Source::Media(Media::Still(frame)))
    }

    /// Push the next decoded video frame. Frames are applied in call order.
    pub fn set_frame(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<(), PalettumError> {
        self.ensure_open("set frame")?;
        let frame = Frame::from_rgba(width, height, rgba)?;
        self.engine.check_dimensions(width, height)?;

        match &mut self.source {
            Some(Source::Video { frame: current, index }) => {
                *current = frame;
                *index += 1;
                Ok(())
            }
            _ => self.replace_source(Source::Video { frame, index: 0 }),
        }
    }

    /// Select the frame used by `preview` for animated sources.
    pub fn seek(&mut self, index: usize) -> Result<(), PalettumError> {
        self.ensure_loaded("seek")?;
        if index >= self.frame_count() {
            return Err(ConfigError::OutOfRange {
                name: "frame",
                value: format!("{index} of {}", self.frame_count()),
            }
            .into());
        }
        self.cursor = index;
        Ok(())
    }

    /// Validate and activate a config. On failure the previous config stays
    /// active.
    pub fn configure(&mut self, config: Config) -> Result<(), PalettumError> {
        self.ensure_open("configure")?;
        config.validate()?;
        let mapper = Mapper::new(config.palette.to_palette()?, config.map_options())?;

        self.mapper = Some(mapper);
        self.config = Some(config);
        if self.source.is_some() {
            self.state = SessionState::Reconfigured;
        }
        Ok(())
    }

    /// Map the current frame with the active config.
    pub fn preview(&mut self) -> Result<Frame, PalettumError> {
        self.ensure_loaded("preview")?;
        let (Some(config), Some(mapper)) = (&self.config, &self.mapper) else {
            return Err(InputError::InvalidState {
                operation: "preview",
                state: self.state.as_str(),
            }
            .into());
        };

        let (frame, index) = match &self.source {
            Some(Source::Media(media)) => (&media.frames()[self.cursor], self.cursor as u64),
            Some(Source::Video { frame, index }) => (frame, *index),
            None => return Err(InputError::EmptyMedia.into()),
        };
        let out = pipeline::process_frame(self.engine, mapper, config, frame, index)?;
        self.state = SessionState::Previewing;
        Ok(out)
    }

    /// Encode the whole source with `config`.
    ///
    /// Stills and video frames export as PNG, animations as GIF and icons as
    /// ICO. The session returns to `Loaded` whether the export succeeds,
    /// fails or is cancelled.
    pub fn export(
        &mut self,
        config: &Config,
        mut progress: impl FnMut(Progress),
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, PalettumError> {
        self.ensure_loaded("export")?;
        config.validate()?;

        self.state = SessionState::Exporting;
        let result = match &self.source {
            Some(Source::Media(media)) => pipeline::render(
                self.engine,
                media.frames(),
                0,
                Output::for_media(media),
                config,
                &mut progress,
                cancel,
            ),
            Some(Source::Video { frame, index }) => pipeline::render(
                self.engine,
                std::slice::from_ref(frame),
                *index,
                Output::Png,
                config,
                &mut progress,
                cancel,
            ),
            None => Err(InputError::EmptyMedia.into()),
        };
        self.state = SessionState::Loaded;

        match &result {
            Ok(bytes) => tracing::info!(size = bytes.len(), "Export finished"),
            Err(PalettumError::Cancelled) => tracing::info!("Export cancelled"),
            Err(e) => tracing::warn!(error = %e, "Export failed"),
        }
        result
    }

    /// Palette of `k` colors drawn from the loaded source.
    pub fn extract_palette(&self, k: usize) -> Result<PaletteRecord, PalettumError> {
        self.ensure_loaded("extract palette")?;
        match &self.source {
            Some(Source::Media(media)) => pipeline::extract(self.engine, media.frames(), k),
            Some(Source::Video { frame, .. }) => {
                pipeline::extract(self.engine, std::slice::from_ref(frame), k)
            }
            None => Err(InputError::EmptyMedia.into()),
        }
    }

    /// Drop all buffers now. Further calls except `dispose` fail.
    pub fn dispose(&mut self) {
        if self.state != SessionState::Disposed {
            tracing::debug!(state = %self.state, "Disposing session");
        }
        self.source = None;
        self.mapper = None;
        self.config = None;
        self.state = SessionState::Disposed;
    }
}

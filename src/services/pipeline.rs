//! Frame pipeline: decode, map every frame, encode
//!
//! Stills come back as PNG, animations as GIF with their original timing and
//! loop count, icons as ICO with every size. Progress is frame-count based,
//! starting with a 0% report, and cancellation is checked before every
//! frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use palettum_core::{Extractor, Mapper, MAX_PALETTE_SIZE};

use crate::engine::Engine;
use crate::error::{ConfigError, InputError, PalettumError};
use crate::media::{self, Frame, LoopCount, Media};
use crate::models::{Config, PaletteRecord};

/// Share of the progress range spent on mapping; the rest covers encoding.
const MAPPING_SHARE: usize = 90;

/// Coarse progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 0..=100
    pub percent: u8,
    pub message: String,
}

impl Progress {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Cloneable flag for aborting an export between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Fail with `PalettumError::Cancelled` once cancellation was requested.
    pub fn check(&self) -> Result<(), PalettumError> {
        if self.is_cancelled() {
            Err(PalettumError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Recolor encoded media; returns PNG for stills, GIF for animations and ICO
/// for icons.
pub fn palettify(engine: &Engine, bytes: &[u8], config: &Config) -> Result<Vec<u8>, PalettumError> {
    config.validate()?;
    let media = Media::decode(bytes)?;
    render(
        engine,
        media.frames(),
        0,
        Output::for_media(&media),
        config,
        &mut |_| {},
        &CancelToken::new(),
    )
}

/// Derive a `k` color palette from encoded media. GIFs are sampled across
/// all frames.
pub fn palette_from_media(
    engine: &Engine,
    bytes: &[u8],
    k: usize,
) -> Result<PaletteRecord, PalettumError> {
    if k == 0 || k > MAX_PALETTE_SIZE {
        return Err(ConfigError::InvalidColorCount {
            requested: k,
            max: MAX_PALETTE_SIZE,
        }
        .into());
    }
    let media = Media::decode(bytes)?;
    extract(engine, media.frames(), k)
}

pub(crate) fn extract(
    engine: &Engine,
    frames: &[Frame],
    k: usize,
) -> Result<PaletteRecord, PalettumError> {
    let frames: Vec<&[u8]> = frames.iter().map(Frame::pixels).collect();
    let colors = engine.install(|| Extractor::new().extract_frames(&frames, k))??;
    tracing::info!(requested = k, colors = colors.len(), "Extracted palette");
    Ok(PaletteRecord::new("extracted", colors))
}

/// Map one frame with an already validated mapper.
pub(crate) fn map_frame(
    engine: &Engine,
    mapper: &Mapper,
    frame: &mut Frame,
    frame_index: u64,
) -> Result<(), PalettumError> {
    let (width, height) = (frame.width(), frame.height());
    engine.check_dimensions(width, height)?;
    let pixels: &mut [u8] = &mut frame.image;
    engine.install(|| mapper.map_frame(pixels, width, height, frame_index))??;
    Ok(())
}

/// Resize and map a copy of `frame` according to `config`.
pub(crate) fn process_frame(
    engine: &Engine,
    mapper: &Mapper,
    config: &Config,
    frame: &Frame,
    frame_index: u64,
) -> Result<Frame, PalettumError> {
    let mut out = if config.wants_resize() {
        let (width, height) = media::target_size(
            frame.width(),
            frame.height(),
            config.resize_width,
            config.resize_height,
            config.resize_scale,
        );
        engine.check_dimensions(width, height)?;
        media::resize_frame(frame, width, height, config.filter)
    } else {
        frame.clone()
    };
    map_frame(engine, mapper, &mut out, frame_index)?;
    Ok(out)
}

/// Container for a rendered frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Output {
    Png,
    Gif(LoopCount),
    Ico,
}

impl Output {
    pub(crate) fn for_media(media: &Media) -> Self {
        match media {
            Media::Still(_) => Output::Png,
            Media::Animation { loop_count, .. } => Output::Gif(*loop_count),
            Media::Icon(_) => Output::Ico,
        }
    }

    pub(crate) fn extension(self) -> &'static str {
        match self {
            Output::Png => "png",
            Output::Gif(_) => "gif",
            Output::Ico => "ico",
        }
    }
}

/// Map every frame and encode the result.
///
/// `first_index` is the dither frame index of `frames[0]`.
pub(crate) fn render(
    engine: &Engine,
    frames: &[Frame],
    first_index: u64,
    output: Output,
    config: &Config,
    progress: &mut dyn FnMut(Progress),
    cancel: &CancelToken,
) -> Result<Vec<u8>, PalettumError> {
    let mapper = Mapper::new(config.palette.to_palette()?, config.map_options())?;
    let first = frames.first().ok_or(InputError::EmptyMedia)?;
    engine.check_dimensions(first.width(), first.height())?;

    let total = frames.len();
    tracing::info!(
        width = first.width(),
        height = first.height(),
        frames = total,
        colors = mapper.palette().len(),
        mapping = %config.mapping,
        "Palettifying"
    );

    progress(Progress::new(0, "Starting"));
    let mut mapped = Vec::with_capacity(total);
    for (i, frame) in frames.iter().enumerate() {
        cancel.check()?;
        mapped.push(process_frame(
            engine,
            &mapper,
            config,
            frame,
            first_index + i as u64,
        )?);
        progress(Progress::new(
            ((i + 1) * MAPPING_SHARE / total) as u8,
            format!("Processed frame {}/{}", i + 1, total),
        ));
    }
    cancel.check()?;

    let bytes = match output {
        Output::Png => {
            let frame = mapped.pop().ok_or(InputError::EmptyMedia)?;
            media::encode_png(&frame)?
        }
        Output::Gif(loop_count) => media::encode_gif(mapped, loop_count)?,
        Output::Ico => media::encode_ico(&mapped)?,
    };
    progress(Progress::new(100, "Done"));
    tracing::debug!(size = bytes.len(), "Encoded output");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use palettum_core::Rgb;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config::new(PaletteRecord::new("bw", vec![Rgb::BLACK, Rgb::WHITE]))
    }

    fn red_frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|_| Frame::from_rgba(2, 2, [255, 0, 0, 255].repeat(4)).unwrap())
            .collect()
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(PalettumError::Cancelled)));
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(Progress::new(150, "x").percent, 100);
    }

    #[test]
    fn test_render_reports_progress_per_frame() {
        let engine = Engine::default();
        let mut reports = Vec::new();
        let bytes = render(
            &engine,
            &red_frames(3),
            0,
            Output::Gif(LoopCount::Infinite),
            &config(),
            &mut |p| reports.push(p.percent),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(&bytes[..3], b"GIF");
        assert_eq!(reports, vec![0, 30, 60, 90, 100]);
    }

    #[test]
    fn test_render_stops_when_cancelled() {
        let engine = Engine::default();
        let cancel = CancelToken::new();
        let mut seen = 0;
        let result = render(
            &engine,
            &red_frames(5),
            0,
            Output::Gif(LoopCount::Infinite),
            &config(),
            &mut |_| {
                seen += 1;
                if seen == 2 {
                    cancel.cancel();
                }
            },
            &cancel,
        );
        assert!(matches!(result, Err(PalettumError::Cancelled)));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_render_reports_start_before_first_frame() {
        let engine = Engine::default();
        let cancel = CancelToken::new();
        let mut reports = Vec::new();
        let result = render(
            &engine,
            &red_frames(2),
            0,
            Output::Png,
            &config(),
            &mut |p| {
                reports.push(p);
                cancel.cancel();
            },
            &cancel,
        );
        assert!(matches!(result, Err(PalettumError::Cancelled)));
        assert_eq!(reports, vec![Progress::new(0, "Starting")]);
    }

    #[test]
    fn test_render_ico_keeps_every_size() {
        let engine = Engine::default();
        let frames = vec![
            Frame::from_rgba(16, 16, [255, 0, 0, 255].repeat(256)).unwrap(),
            Frame::from_rgba(32, 32, [10, 10, 10, 255].repeat(1024)).unwrap(),
        ];
        let bytes = render(
            &engine,
            &frames,
            0,
            Output::Ico,
            &config(),
            &mut |_| {},
            &CancelToken::new(),
        )
        .unwrap();

        let Media::Icon(out) = Media::decode(&bytes).unwrap() else {
            panic!("expected icon");
        };
        assert_eq!(out.len(), 2);
        assert_eq!((out[1].width(), out[1].height()), (32, 32));
        assert!(out[0].pixels().chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
        assert!(out[1].pixels().chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_render_empty_frames() {
        let result = render(
            &Engine::default(),
            &[],
            0,
            Output::Png,
            &config(),
            &mut |_| {},
            &CancelToken::new(),
        );
        assert!(matches!(
            result,
            Err(PalettumError::Input(InputError::EmptyMedia))
        ));
    }

    #[test]
    fn test_process_frame_resizes_then_maps() {
        let engine = Engine::default();
        let mut config = config();
        config.resize_width = Some(1);
        let mapper = Mapper::new(config.palette.to_palette().unwrap(), config.map_options()).unwrap();
        let out = process_frame(&engine, &mapper, &config, &red_frames(1)[0], 0).unwrap();
        assert_eq!((out.width(), out.height()), (1, 1));
        assert_eq!(out.pixels(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_palette_from_media_rejects_bad_k() {
        let engine = Engine::default();
        for k in [0, 256] {
            assert!(matches!(
                palette_from_media(&engine, b"irrelevant", k),
                Err(PalettumError::Config(ConfigError::InvalidColorCount { .. }))
            ));
        }
    }
}

//! Media decode and encode
//!
//! Inputs are sniffed by magic bytes. GIFs decode into a list of composited
//! RGBA frames with their delays and loop count, icons into one frame per
//! stored size; every other supported format decodes into a single still
//! frame.

pub mod gif;
pub mod ico;
pub mod resize;
pub mod still;

use image::{ImageFormat, RgbaImage};

use crate::error::InputError;

pub use gif::{encode_gif, LoopCount};
pub use ico::encode_ico;
pub use resize::{resize_frame, target_size};
pub use still::encode_png;

/// One RGBA frame with its display duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: RgbaImage,
    /// Display time in milliseconds; 0 for stills
    pub delay_ms: u32,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image, delay_ms: 0 }
    }

    /// Wrap a packed RGBA buffer, checking its length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, InputError> {
        let expected = width as usize * height as usize * 4;
        let actual = pixels.len();
        RgbaImage::from_raw(width, height, pixels)
            .filter(|_| actual == expected)
            .map(Self::new)
            .ok_or(InputError::SizeMismatch {
                width,
                height,
                expected,
                actual,
            })
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.image.into_raw()
    }
}

/// Decoded input media.
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    Still(Frame),
    Animation {
        frames: Vec<Frame>,
        loop_count: LoopCount,
    },
    /// Every size stored in an icon
    Icon(Vec<Frame>),
}

impl Media {
    /// Detect the format from magic bytes and decode.
    pub fn decode(bytes: &[u8]) -> Result<Self, InputError> {
        let format = image::guess_format(bytes).map_err(|_| InputError::UnsupportedFormat)?;
        if !format.reading_enabled() {
            return Err(InputError::UnsupportedFormat);
        }

        let media = match format {
            ImageFormat::Gif => gif::decode(bytes)?,
            ImageFormat::Ico => ico::decode(bytes)?,
            _ => Media::Still(still::decode(bytes, format)?),
        };

        let (width, height) = media.dimensions();
        tracing::debug!(
            format = ?format,
            width,
            height,
            frames = media.frames().len(),
            "Decoded media"
        );
        Ok(media)
    }

    pub fn frames(&self) -> &[Frame] {
        match self {
            Media::Still(frame) => std::slice::from_ref(frame),
            Media::Animation { frames, .. } | Media::Icon(frames) => frames,
        }
    }

    /// Canvas size of the first frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames()
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0))
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Media::Animation { .. })
    }
}

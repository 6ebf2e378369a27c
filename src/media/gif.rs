//! Animated GIF decode and encode
//!
//! Decoding goes through `image`, which composites each frame onto the full
//! canvas. Frames are written back as full-canvas images that clear to the
//! background when they end, so transparent areas of a frame never show the
//! frame before it.

use std::io::Cursor;

use ::gif::{DisposalMethod, Encoder, Repeat};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use super::{Frame, Media};
use crate::error::{InputError, ResourceError};

/// Quantizer speed handed to the GIF encoder (1 best, 30 fastest).
const ENCODER_SPEED: i32 = 10;

/// How often an animation repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    #[default]
    Infinite,
    Finite(u16),
}

impl From<LoopCount> for Repeat {
    fn from(count: LoopCount) -> Self {
        match count {
            LoopCount::Infinite => Repeat::Infinite,
            LoopCount::Finite(n) => Repeat::Finite(n),
        }
    }
}

/// Decode every frame, composited onto the full canvas.
pub fn decode(bytes: &[u8]) -> Result<Media, InputError> {
    let decoder =
        GifDecoder::new(Cursor::new(bytes)).map_err(|e| InputError::Decode(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| InputError::Decode(e.to_string()))?;
    if frames.is_empty() {
        return Err(InputError::EmptyMedia);
    }

    let frames: Vec<Frame> = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 { 0 } else { numer / denom };
            Frame::new(frame.into_buffer()).with_delay(delay_ms)
        })
        .collect();

    let loop_count = read_loop_count(bytes).unwrap_or_default();
    tracing::debug!(frames = frames.len(), ?loop_count, "Decoded GIF");

    Ok(Media::Animation { frames, loop_count })
}

fn encode_error(e: ::gif::EncodingError) -> ResourceError {
    ResourceError::Encode(e.to_string())
}

fn gif_size(width: u32, height: u32) -> Result<(u16, u16), ResourceError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ResourceError::Encode(format!(
            "{width}x{height} exceeds the GIF size limit of 65535"
        ))),
    }
}

/// GIF delays count hundredths of a second.
fn delay_centis(delay_ms: u32) -> u16 {
    (delay_ms.saturating_add(5) / 10).min(u16::MAX as u32) as u16
}

/// Encode frames as an animated GIF with the given repeat behavior.
pub fn encode_gif(frames: Vec<Frame>, loop_count: LoopCount) -> Result<Vec<u8>, ResourceError> {
    let (width, height) = frames
        .first()
        .map(|f| (f.width(), f.height()))
        .unwrap_or((0, 0));
    let (width, height) = gif_size(width, height)?;

    let mut buf = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buf, width, height, &[]).map_err(encode_error)?;
        encoder.set_repeat(loop_count.into()).map_err(encode_error)?;

        for frame in frames {
            let (w, h) = gif_size(frame.width(), frame.height())?;
            let delay = delay_centis(frame.delay_ms);
            let mut pixels = frame.into_pixels();
            // One transparent palette slot only; hidden RGB would take others
            for px in pixels.chunks_exact_mut(4) {
                if px[3] == 0 {
                    px.copy_from_slice(&[0, 0, 0, 0]);
                }
            }

            let mut out = ::gif::Frame::from_rgba_speed(w, h, &mut pixels, ENCODER_SPEED);
            out.delay = delay;
            out.dispose = DisposalMethod::Background;
            encoder.write_frame(&out).map_err(encode_error)?;
        }
    }
    Ok(buf)
}

/// Find the NETSCAPE2.0 loop count before the first image descriptor.
///
/// Returns `None` when the extension is absent or the stream is truncated.
pub fn read_loop_count(bytes: &[u8]) -> Option<LoopCount> {
    if bytes.get(..3)? != b"GIF" {
        return None;
    }

    // Header (6) + logical screen descriptor (7), then the optional global
    // color table of 3 * 2^(n+1) bytes
    let packed = *bytes.get(10)?;
    let mut pos = 13;
    if packed & 0x80 != 0 {
        pos += 3 * (1usize << ((packed & 0x07) + 1));
    }

    loop {
        match *bytes.get(pos)? {
            0x21 => {
                let label = *bytes.get(pos + 1)?;
                pos += 2;
                let mut blocks = Vec::new();
                loop {
                    let len = *bytes.get(pos)? as usize;
                    pos += 1;
                    if len == 0 {
                        break;
                    }
                    blocks.push(bytes.get(pos..pos + len)?);
                    pos += len;
                }
                if label == 0xFF && blocks.first() == Some(&&b"NETSCAPE2.0"[..]) {
                    if let Some(data) = blocks.get(1).filter(|d| d.len() >= 3 && d[0] == 1) {
                        return Some(match u16::from_le_bytes([data[1], data[2]]) {
                            0 => LoopCount::Infinite,
                            n => LoopCount::Finite(n),
                        });
                    }
                }
            }
            _ => return None,
        }
    }
}

//! Multi-size ICO decode and encode
//!
//! `image` decodes only the best entry of an icon, so the directory is read
//! here and every entry is decoded on its own. Output icons store each entry
//! as PNG.

use std::io::Cursor;

use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{ExtendedColorType, ImageFormat};

use super::{Frame, Media};
use crate::error::{InputError, ResourceError};

const HEADER_LEN: usize = 6;
const ENTRY_LEN: usize = 16;

/// Largest side an ICO entry can describe.
pub const MAX_ICON_SIZE: u32 = 256;

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

/// Wrap one directory entry and its image data as a standalone icon.
fn single_entry(bytes: &[u8], entry: usize) -> Option<Vec<u8>> {
    let dir = bytes.get(entry..entry + ENTRY_LEN)?;
    let size = read_u32(dir, 8)? as usize;
    let offset = read_u32(dir, 12)? as usize;
    let data = bytes.get(offset..offset.checked_add(size)?)?;

    let mut icon = Vec::with_capacity(HEADER_LEN + ENTRY_LEN + data.len());
    icon.extend_from_slice(&[0, 0, 1, 0, 1, 0]);
    icon.extend_from_slice(&dir[..12]);
    icon.extend_from_slice(&((HEADER_LEN + ENTRY_LEN) as u32).to_le_bytes());
    icon.extend_from_slice(data);
    Some(icon)
}

/// Decode every entry of an icon in directory order.
pub fn decode(bytes: &[u8]) -> Result<Media, InputError> {
    let truncated = || InputError::Decode("truncated ICO directory".into());
    if read_u16(bytes, 0) != Some(0) || read_u16(bytes, 2) != Some(1) {
        return Err(InputError::Decode("not an icon resource".into()));
    }
    let count = read_u16(bytes, 4).ok_or_else(truncated)? as usize;
    if count == 0 {
        return Err(InputError::EmptyMedia);
    }

    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        let icon = single_entry(bytes, HEADER_LEN + i * ENTRY_LEN).ok_or_else(truncated)?;
        let image = image::load_from_memory_with_format(&icon, ImageFormat::Ico)
            .map_err(|e| InputError::Decode(format!("ICO entry {i}: {e}")))?;
        frames.push(Frame::new(image.into_rgba8()));
    }

    tracing::debug!(entries = frames.len(), "Decoded ICO");
    Ok(Media::Icon(frames))
}

/// Encode frames as one icon with a PNG entry per frame.
pub fn encode_ico(frames: &[Frame]) -> Result<Vec<u8>, ResourceError> {
    let entries = frames
        .iter()
        .map(|frame| {
            if frame.width() > MAX_ICON_SIZE || frame.height() > MAX_ICON_SIZE {
                return Err(ResourceError::Encode(format!(
                    "{}x{} exceeds the ICO entry limit of {MAX_ICON_SIZE}",
                    frame.width(),
                    frame.height()
                )));
            }
            IcoFrame::as_png(
                frame.pixels(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| ResourceError::Encode(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut buf = Cursor::new(Vec::new());
    IcoEncoder::new(&mut buf)
        .encode_images(&entries)
        .map_err(|e| ResourceError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

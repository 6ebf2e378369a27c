use std::io::Cursor;

use image::ImageFormat;

use super::Frame;
use crate::error::{InputError, ResourceError};

/// Decode a single-frame image into RGBA8.
pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<Frame, InputError> {
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| InputError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(InputError::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(Frame::new(image.into_rgba8()))
}

/// Encode a frame as RGBA8 PNG.
///
/// The image is written with fast settings and then recompressed with
/// oxipng; if recompression fails the fast encoding is returned as is.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, ResourceError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, frame.width(), frame.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        encoder.set_filter(png::FilterType::NoFilter);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ResourceError::Encode(e.to_string()))?;
        writer
            .write_image_data(frame.pixels())
            .map_err(|e| ResourceError::Encode(e.to_string()))?;
    }
    let png_bytes = buf.into_inner();

    let optimized = oxipng::optimize_from_memory(
        &png_bytes,
        &oxipng::Options {
            strip: oxipng::StripChunks::Safe,
            optimize_alpha: false,
            ..Default::default()
        },
    )
    .unwrap_or_else(|e| {
        tracing::debug!(error = %e, "PNG recompression skipped");
        png_bytes
    });
    tracing::debug!(
        width = frame.width(),
        height = frame.height(),
        size = optimized.len(),
        "Encoded PNG"
    );
    Ok(optimized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_signature() {
        let frame = Frame::from_rgba(1, 1, vec![10, 20, 30, 255]).unwrap();
        let png = encode_png(&frame).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_png_keeps_transparency() {
        let pixels = vec![255, 0, 0, 0, 0, 255, 0, 255, 0, 0, 255, 128, 9, 9, 9, 255];
        let frame = Frame::from_rgba(2, 2, pixels).unwrap();
        let png = encode_png(&frame).unwrap();
        let decoded = decode(&png, ImageFormat::Png).unwrap();
        for (a, b) in decoded.pixels().chunks_exact(4).zip(frame.pixels().chunks_exact(4)) {
            assert_eq!(a[3], b[3]);
            if b[3] > 0 {
                assert_eq!(a, b);
            }
        }
    }
}

//! Assertion helpers for tests.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use palettum::Rgb;
use pretty_assertions::assert_eq;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Assert bytes are a PNG and decode them
pub fn assert_png(bytes: &[u8]) -> RgbaImage {
    assert!(
        bytes.starts_with(&PNG_SIGNATURE),
        "Expected PNG image, got {} bytes starting with {:?}",
        bytes.len(),
        &bytes[..8.min(bytes.len())]
    );
    image::load_from_memory(bytes)
        .expect("decodable PNG")
        .into_rgba8()
}

/// Assert bytes are a GIF and decode its frames with delays in milliseconds
pub fn assert_gif(bytes: &[u8]) -> Vec<(RgbaImage, u32)> {
    assert!(
        bytes.starts_with(b"GIF8"),
        "Expected GIF, got {:?}",
        &bytes[..6.min(bytes.len())]
    );
    let decoder = GifDecoder::new(Cursor::new(bytes)).expect("GIF header");
    decoder
        .into_frames()
        .collect_frames()
        .expect("GIF frames")
        .into_iter()
        .map(|f| {
            let (n, d) = f.delay().numer_denom_ms();
            (f.into_buffer(), n / d)
        })
        .collect()
}

/// Assert every pixel with alpha >= `threshold` has a palette color
pub fn assert_in_palette(image: &RgbaImage, palette: &[Rgb], threshold: u8) {
    for (x, y, px) in image.enumerate_pixels() {
        if px[3] < threshold {
            continue;
        }
        let color = Rgb::new(px[0], px[1], px[2]);
        assert!(
            palette.contains(&color),
            "pixel ({x}, {y}) = {color} is not in the palette"
        );
    }
}

/// Assert every pixel equals `px`
pub fn assert_solid(image: &RgbaImage, px: [u8; 4]) {
    for (x, y, p) in image.enumerate_pixels() {
        assert_eq!(p.0, px, "pixel ({x}, {y})");
    }
}

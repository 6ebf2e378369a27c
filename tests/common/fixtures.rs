//! Test fixtures: synthetic images, GIFs and configs.

use std::io::Cursor;

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{Delay, ExtendedColorType, Frame, ImageFormat, Rgba, RgbaImage};
use palettum::{Config, PaletteRecord, Rgb};

pub const RED: [u8; 4] = [255, 0, 0, 255];

/// Black and white palette
pub fn bw_palette() -> PaletteRecord {
    PaletteRecord::new("bw", vec![Rgb::BLACK, Rgb::WHITE])
}

/// Config with the black/white palette and defaults otherwise
pub fn bw_config() -> Config {
    Config::new(bw_palette())
}

/// Solid RGBA image
pub fn solid(width: u32, height: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(px))
}

/// Colorful test pattern with a transparent diagonal
pub fn pattern(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x == y { 0 } else { 255 };
        Rgba([
            (x * 255 / (width - 1).max(1)) as u8,
            (y * 255 / (height - 1).max(1)) as u8,
            ((x * 7 + y * 13) % 256) as u8,
            alpha,
        ])
    })
}

/// Encode an image as PNG bytes
pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encode");
    buf.into_inner()
}

/// Encode frames as an animated GIF with per-frame delays in milliseconds
pub fn gif_bytes(frames: &[(RgbaImage, u32)], repeat: Repeat) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(repeat).expect("set repeat");
        for (image, delay) in frames {
            encoder
                .encode_frame(Frame::from_parts(
                    image.clone(),
                    0,
                    0,
                    Delay::from_numer_denom_ms(*delay, 1),
                ))
                .expect("GIF encode");
        }
    }
    buf
}

/// Three-frame GIF cycling red, green and blue
pub fn rgb_gif(repeat: Repeat) -> Vec<u8> {
    gif_bytes(
        &[
            (solid(6, 4, RED), 100),
            (solid(6, 4, [0, 255, 0, 255]), 200),
            (solid(6, 4, [0, 0, 255, 255]), 300),
        ],
        repeat,
    )
}

/// Sprite hopping right across a transparent canvas, one frame per step.
///
/// Written with background disposal so each decoded frame shows only the
/// sprite's current position.
pub fn sprite_gif(steps: u32) -> Vec<u8> {
    let (width, height) = (4 * steps as u16, 4u16);
    let mut buf = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut buf, width, height, &[]).expect("GIF header");
        encoder.set_repeat(gif::Repeat::Infinite).expect("set repeat");
        for step in 0..steps {
            let mut canvas = RgbaImage::from_pixel(width as u32, height as u32, Rgba([0, 0, 0, 0]));
            for dy in 0..2 {
                for dx in 0..2 {
                    canvas.put_pixel(step * 4 + 1 + dx, 1 + dy, Rgba(RED));
                }
            }
            let mut pixels = canvas.into_raw();
            let mut frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, 10);
            frame.delay = 10;
            frame.dispose = gif::DisposalMethod::Background;
            encoder.write_frame(&frame).expect("GIF frame");
        }
    }
    buf
}

/// Icon with one PNG entry per image
pub fn ico_bytes(images: &[RgbaImage]) -> Vec<u8> {
    let entries: Vec<IcoFrame> = images
        .iter()
        .map(|image| {
            IcoFrame::as_png(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .expect("ICO entry")
        })
        .collect();
    let mut buf = Vec::new();
    IcoEncoder::new(&mut buf)
        .encode_images(&entries)
        .expect("ICO encode");
    buf
}

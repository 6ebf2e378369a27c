//! End-to-end tests for `palettify` on encoded stills, icons and GIFs.

mod common;

use common::fixtures::{self, RED};
use image::codecs::gif::Repeat;
use image::{Rgba, RgbaImage};
use palettum::media::gif::read_loop_count;
use palettum::media::{LoopCount, Media};
use palettum::{
    palettify, ConfigError, DitherAlgorithm, Engine, InputError, Mapping, PaletteRecord,
    PalettumError, Rgb,
};
use pretty_assertions::assert_eq;

#[test]
fn test_red_square_palettized_becomes_white() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::solid(2, 2, RED));

    let output = palettify(&engine, &input, &fixtures::bw_config()).unwrap();

    let image = common::assert_png(&output);
    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(image.as_raw(), &[255u8, 255, 255, 255].repeat(4));
}

#[test]
fn test_red_square_smoothed_becomes_gray() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::solid(2, 2, RED));
    let mut config = fixtures::bw_config();
    config.mapping = Mapping::Smoothed;
    config.smooth_strength = 1.0;

    let image = common::assert_png(&palettify(&engine, &input, &config).unwrap());

    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        assert_eq!(a, 255);
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "not gray: {:?}", px.0);
        assert!(r > 0 && r < 255, "expected a blend, got {:?}", px.0);
    }
}

#[test]
fn test_output_is_deterministic() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::pattern(40, 30));
    let mut config = palettum::Config::new(PaletteRecord::new(
        "four",
        vec![
            Rgb::BLACK,
            Rgb::WHITE,
            Rgb::new(200, 30, 30),
            Rgb::new(30, 30, 200),
        ],
    ));
    config.dither_algorithm = DitherAlgorithm::Bn;
    config.dither_strength = 0.8;
    config.quant_level = 2;

    let first = palettify(&engine, &input, &config).unwrap();
    let second = palettify(&engine, &input, &config).unwrap();
    assert_eq!(first, second);

    let image = common::assert_png(&first);
    common::assert_in_palette(&image, &config.palette.colors, 128);
}

#[test]
fn test_transparent_pixels_are_cleared() {
    let engine = Engine::default();
    let source = fixtures::pattern(16, 16);
    let input = fixtures::png_bytes(&source);

    let image = common::assert_png(&palettify(&engine, &input, &fixtures::bw_config()).unwrap());

    for (x, y, px) in image.enumerate_pixels() {
        let expected_alpha = if x == y { 0 } else { 255 };
        assert_eq!(px[3], expected_alpha, "alpha at ({x}, {y})");
    }
    common::assert_in_palette(&image, &[Rgb::BLACK, Rgb::WHITE], 1);
}

#[test]
fn test_zero_threshold_maps_everything() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::pattern(8, 8));
    let mut config = fixtures::bw_config();
    config.transparency_threshold = 0;

    let image = common::assert_png(&palettify(&engine, &input, &config).unwrap());
    assert!(image.pixels().all(|px| px[3] == 255));
    common::assert_in_palette(&image, &[Rgb::BLACK, Rgb::WHITE], 0);
}

#[test]
fn test_resize_before_mapping() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::solid(8, 4, RED));
    let mut config = fixtures::bw_config();
    config.resize_width = Some(2);

    let image = common::assert_png(&palettify(&engine, &input, &config).unwrap());
    assert_eq!(image.dimensions(), (2, 1));
    common::assert_solid(&image, [255, 255, 255, 255]);
}

#[test]
fn test_empty_palette_rejected() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::solid(2, 2, RED));
    let config = palettum::Config::new(PaletteRecord::new("empty", vec![]));

    let err = palettify(&engine, &input, &config).unwrap_err();
    assert!(
        matches!(err, PalettumError::Config(ConfigError::EmptyPalette)),
        "got {err:?}"
    );
}

#[test]
fn test_config_checked_before_decoding() {
    let engine = Engine::default();
    let mut config = fixtures::bw_config();
    config.dither_strength = 2.0;

    let err = palettify(&engine, b"not an image", &config).unwrap_err();
    assert!(matches!(err, PalettumError::Config(ConfigError::OutOfRange { .. })));
}

#[test]
fn test_invalid_media_rejected() {
    let engine = Engine::default();
    let err = palettify(&engine, b"plain text", &fixtures::bw_config()).unwrap_err();
    assert!(matches!(err, PalettumError::Input(InputError::UnsupportedFormat)));

    let mut truncated = fixtures::png_bytes(&fixtures::solid(4, 4, RED));
    truncated.truncate(20);
    let err = palettify(&engine, &truncated, &fixtures::bw_config()).unwrap_err();
    assert!(matches!(err, PalettumError::Input(InputError::Decode(_))), "got {err:?}");
}

#[test]
fn test_gif_keeps_timing_and_loop_count() {
    let engine = Engine::default();
    let input = fixtures::rgb_gif(Repeat::Finite(2));
    let palette = vec![
        Rgb::BLACK,
        Rgb::new(250, 10, 10),
        Rgb::new(10, 250, 10),
        Rgb::new(10, 10, 250),
    ];
    let config = palettum::Config::new(PaletteRecord::new("rgb", palette));

    let output = palettify(&engine, &input, &config).unwrap();

    assert_eq!(read_loop_count(&output), Some(LoopCount::Finite(2)));
    let frames = common::assert_gif(&output);
    let delays: Vec<u32> = frames.iter().map(|(_, d)| *d).collect();
    assert_eq!(delays, vec![100, 200, 300]);

    common::assert_solid(&frames[0].0, [250, 10, 10, 255]);
    common::assert_solid(&frames[1].0, [10, 250, 10, 255]);
    common::assert_solid(&frames[2].0, [10, 10, 250, 255]);
}

#[test]
fn test_gif_without_loop_count_loops_forever() {
    let engine = Engine::default();
    let input = fixtures::rgb_gif(Repeat::Infinite);
    let output = palettify(&engine, &input, &fixtures::bw_config()).unwrap();
    assert_eq!(read_loop_count(&output), Some(LoopCount::Infinite));
    assert_eq!(common::assert_gif(&output).len(), 3);
}

#[test]
fn test_moving_sprite_leaves_no_trail() {
    let engine = Engine::default();
    let output = palettify(&engine, &fixtures::sprite_gif(3), &fixtures::bw_config()).unwrap();

    let frames = common::assert_gif(&output);
    assert_eq!(frames.len(), 3);
    for (step, (image, _)) in frames.iter().enumerate() {
        for (x, y, px) in image.enumerate_pixels() {
            let in_sprite = x / 4 == step as u32 && (1..3).contains(&(x % 4)) && (1..3).contains(&y);
            if in_sprite {
                assert_eq!(px.0, [255, 255, 255, 255], "frame {step} ({x}, {y})");
            } else {
                assert_eq!(px[3], 0, "frame {step} ({x}, {y}) should be clear");
            }
        }
    }
}

#[test]
fn test_icon_keeps_every_size() {
    let engine = Engine::default();
    let input = fixtures::ico_bytes(&[
        fixtures::solid(16, 16, RED),
        fixtures::solid(32, 32, [20, 20, 20, 255]),
        RgbaImage::from_fn(48, 48, |x, _| {
            if x < 24 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([240, 240, 240, 255])
            }
        }),
    ]);

    let output = palettify(&engine, &input, &fixtures::bw_config()).unwrap();
    let Media::Icon(frames) = Media::decode(&output).unwrap() else {
        panic!("expected an icon");
    };
    let sizes: Vec<(u32, u32)> = frames.iter().map(|f| (f.width(), f.height())).collect();
    assert_eq!(sizes, vec![(16, 16), (32, 32), (48, 48)]);

    common::assert_solid(&frames[0].image, [255, 255, 255, 255]);
    common::assert_solid(&frames[1].image, [0, 0, 0, 255]);
    assert_eq!(frames[2].image.get_pixel(3, 3)[3], 0);
    assert_eq!(frames[2].image.get_pixel(40, 3).0, [255, 255, 255, 255]);
}

#[test]
fn test_icon_resize_applies_to_each_size() {
    let engine = Engine::default();
    let input = fixtures::ico_bytes(&[fixtures::solid(16, 16, RED), fixtures::solid(64, 64, RED)]);
    let mut config = fixtures::bw_config();
    config.resize_scale = Some(0.5);

    let output = palettify(&engine, &input, &config).unwrap();
    let media = Media::decode(&output).unwrap();
    let sizes: Vec<(u32, u32)> = media.frames().iter().map(|f| (f.width(), f.height())).collect();
    assert_eq!(sizes, vec![(8, 8), (32, 32)]);
}

#[test]
fn test_error_diffusion_stays_in_palette() {
    let engine = Engine::default();
    let input = fixtures::png_bytes(&fixtures::pattern(24, 24));
    let palette = vec![
        Rgb::BLACK,
        Rgb::WHITE,
        Rgb::new(220, 30, 30),
        Rgb::new(30, 30, 220),
    ];
    for mapping in [Mapping::Palettized, Mapping::SmoothedPalettized] {
        let mut config = palettum::Config::new(PaletteRecord::new("four", palette.clone()));
        config.mapping = mapping;
        config.dither_algorithm = DitherAlgorithm::FloydSteinberg;
        config.dither_strength = 1.0;

        let first = palettify(&engine, &input, &config).unwrap();
        let second = palettify(&engine, &input, &config).unwrap();
        assert_eq!(first, second, "{mapping}");

        let image = common::assert_png(&first);
        common::assert_in_palette(&image, &palette, 1);
        for (x, y, px) in image.enumerate_pixels() {
            let expected = if x == y { 0 } else { 255 };
            assert_eq!(px[3], expected, "{mapping} alpha at ({x}, {y})");
        }
    }
}

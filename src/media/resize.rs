use image::imageops::{self, FilterType};

use super::Frame;
use crate::models::Filter;

impl From<Filter> for FilterType {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Output size for the requested resize.
///
/// A single given side keeps the aspect ratio; `scale` multiplies the
/// result. Neither side drops below 1.
pub fn target_size(
    width: u32,
    height: u32,
    resize_width: Option<u32>,
    resize_height: Option<u32>,
    scale: Option<f32>,
) -> (u32, u32) {
    let (w, h) = match (resize_width, resize_height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let h = (w as f64 * height as f64 / width.max(1) as f64).round() as u32;
            (w, h)
        }
        (None, Some(h)) => {
            let w = (h as f64 * width as f64 / height.max(1) as f64).round() as u32;
            (w, h)
        }
        (None, None) => (width, height),
    };

    let (w, h) = match scale {
        Some(s) => (
            (w as f64 * s as f64).round() as u32,
            (h as f64 * s as f64).round() as u32,
        ),
        None => (w, h),
    };

    (w.max(1), h.max(1))
}

/// Resample a frame; returns a clone when the size is unchanged.
pub fn resize_frame(frame: &Frame, width: u32, height: u32, filter: Filter) -> Frame {
    if frame.width() == width && frame.height() == height {
        return frame.clone();
    }
    Frame {
        image: imageops::resize(&frame.image, width, height, filter.into()),
        delay_ms: frame.delay_ms,
    }
}

//! Dithering: ordered blue noise and Floyd-Steinberg error diffusion
//!
//! Blue noise perturbs each pixel before it is matched against the
//! palette, so that quantization error shows up as fine grain instead of
//! banding. The perturbation is a pure function of the pixel position and
//! the frame index: re-running a frame reproduces it exactly, while
//! consecutive frames of an animation get a shifted pattern.
//!
//! Floyd-Steinberg instead carries each pixel's mapping error over to its
//! unvisited neighbors (see [`diffusion`]). It runs serially per frame and
//! does not depend on the frame index.
//!
//! The offset added to every channel is
//!
//! ```text
//! ((threshold(x, y, frame) + 0.5) / 256 - 0.5) * strength * 255 / cbrt(palette_len)
//! ```
//!
//! `255 / cbrt(n)` is the classic ordered-dither spread: the expected spacing
//! between palette colors per channel for an evenly distributed palette of
//! `n` colors. Strength scales it linearly from no perturbation to that full
//! spread.

mod blue_noise;
pub mod diffusion;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::UnknownVariant;
use blue_noise::{BLUE_NOISE_64, SIZE};

/// Per-frame shift of the noise tile. Both are odd, so every residue
/// modulo 64 is visited before the pattern repeats.
const FRAME_SHIFT_X: usize = 23;
const FRAME_SHIFT_Y: usize = 41;

/// Dithering applied before palette matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DitherAlgorithm {
    #[default]
    None,
    /// Ordered dithering against a blue noise threshold tile
    Bn,
    /// Error diffusion with the Floyd-Steinberg kernel
    FloydSteinberg,
}

impl DitherAlgorithm {
    pub const ALL: [DitherAlgorithm; 3] = [Self::None, Self::Bn, Self::FloydSteinberg];

    pub fn as_str(self) -> &'static str {
        match self {
            DitherAlgorithm::None => "None",
            DitherAlgorithm::Bn => "Bn",
            DitherAlgorithm::FloydSteinberg => "FloydSteinberg",
        }
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DitherAlgorithm {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("ditherAlgorithm", s))
    }
}

/// Blue noise perturbation bound to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlueNoise {
    amplitude: f32,
    shift_x: usize,
    shift_y: usize,
}

impl BlueNoise {
    /// # Arguments
    /// * `strength` - 0.0..=1.0, linear scale of the perturbation
    /// * `palette_len` - number of palette colors the frame is mapped to
    /// * `frame_index` - position of the frame in its sequence
    pub fn new(strength: f32, palette_len: usize, frame_index: u64) -> Self {
        let spread = 255.0 / (palette_len.max(1) as f32).cbrt();
        let frame = (frame_index % SIZE as u64) as usize;
        Self {
            amplitude: strength.clamp(0.0, 1.0) * spread,
            shift_x: frame * FRAME_SHIFT_X % SIZE,
            shift_y: frame * FRAME_SHIFT_Y % SIZE,
        }
    }

    /// Signed channel offset for the pixel at (x, y).
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> f32 {
        let threshold = BLUE_NOISE_64[(y + self.shift_y) % SIZE][(x + self.shift_x) % SIZE];
        ((threshold as f32 + 0.5) / 256.0 - 0.5) * self.amplitude
    }

    /// Apply the offset at (x, y) to every channel of `color`.
    #[inline]
    pub fn perturb(&self, color: Rgb, x: usize, y: usize) -> Rgb {
        let offset = self.offset(x, y);
        let shift = |c: u8| (c as f32 + offset).round().clamp(0.0, 255.0) as u8;
        Rgb::new(shift(color.r), shift(color.g), shift(color.b))
    }
}

//! CIE L*a*b* color type
//!
//! All distance formulas and all blending happen in Lab. Conversion goes
//! through linear sRGB and CIE XYZ with the D65 reference white.

use super::lut::{linear_to_srgb, srgb_u8_to_linear};
use super::rgb::Rgb;

// D65 reference white, 2° observer, scaled so that Y = 100
const WHITE_X: f64 = 95.047;
const WHITE_Y: f64 = 100.000;
const WHITE_Z: f64 = 108.883;

// CIE constants as commonly tabulated (not the exact rationals)
const EPSILON: f64 = 0.008856;
const KAPPA: f64 = 903.3;

/// A color in CIE L*a*b* space.
///
/// `l` is in 0..=100, `a` and `b` are unbounded in principle but lie in
/// roughly -128..=128 for colors inside the sRGB gamut.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    #[inline]
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Chroma, the distance from the neutral axis.
    #[inline]
    pub fn chroma(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Convert back to 8-bit sRGB, rounding each channel and clamping
    /// out-of-gamut values.
    pub fn to_rgb(self) -> Rgb {
        let fy = (self.l + 16.0) / 116.0;
        let fx = self.a / 500.0 + fy;
        let fz = fy - self.b / 200.0;

        let xr = inverse_pivot(fx);
        let yr = if self.l > KAPPA * EPSILON {
            fy * fy * fy
        } else {
            self.l / KAPPA
        };
        let zr = inverse_pivot(fz);

        let x = xr * WHITE_X / 100.0;
        let y = yr * WHITE_Y / 100.0;
        let z = zr * WHITE_Z / 100.0;

        let r = x * 3.2404542 - y * 1.5371385 - z * 0.4985314;
        let g = -x * 0.9692660 + y * 1.8760108 + z * 0.0415560;
        let b = x * 0.0556434 - y * 0.2040259 + z * 1.0572252;

        Rgb::new(encode_channel(r), encode_channel(g), encode_channel(b))
    }
}

impl From<Rgb> for Lab {
    fn from(rgb: Rgb) -> Self {
        let r = srgb_u8_to_linear(rgb.r);
        let g = srgb_u8_to_linear(rgb.g);
        let b = srgb_u8_to_linear(rgb.b);

        let x = (r * 0.4124564 + g * 0.3575761 + b * 0.1804375) * 100.0;
        let y = (r * 0.2126729 + g * 0.7151522 + b * 0.0721750) * 100.0;
        let z = (r * 0.0193339 + g * 0.1191920 + b * 0.9503041) * 100.0;

        let fx = pivot(x / WHITE_X);
        let fy = pivot(y / WHITE_Y);
        let fz = pivot(z / WHITE_Z);

        Lab {
            l: (116.0 * fy - 16.0).max(0.0),
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

#[inline]
fn pivot(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn inverse_pivot(f: f64) -> f64 {
    let cubed = f * f * f;
    if cubed > EPSILON {
        cubed
    } else {
        (116.0 * f - 16.0) / KAPPA
    }
}

#[inline]
fn encode_channel(linear: f64) -> u8 {
    (linear_to_srgb(linear) * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::{white_point::D65, IntoColor, Srgb};

    fn reference_lab(rgb: Rgb) -> palette::Lab<D65, f64> {
        Srgb::new(rgb.r, rgb.g, rgb.b)
            .into_format::<f64>()
            .into_linear()
            .into_color()
    }

    /// The tabulated constants differ from the exact CIE rationals by a tiny
    /// amount, so agreement with an independent implementation is checked
    /// to a small tolerance rather than bit-exactly.
    #[test]
    fn test_lab_matches_palette_crate() {
        let samples = [
            Rgb::new(0, 0, 0),
            Rgb::new(255, 255, 255),
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(128, 128, 128),
            Rgb::new(12, 200, 77),
            Rgb::new(250, 128, 3),
            Rgb::new(1, 2, 3),
        ];
        for rgb in samples {
            let ours = Lab::from(rgb);
            let theirs = reference_lab(rgb);
            assert!(
                (ours.l - theirs.l).abs() < 0.05
                    && (ours.a - theirs.a).abs() < 0.1
                    && (ours.b - theirs.b).abs() < 0.1,
                "Lab mismatch for {rgb}: ours {ours:?}, palette crate {theirs:?}"
            );
        }
    }

    #[test]
    fn test_known_anchor_values() {
        let black = Lab::from(Rgb::BLACK);
        assert_eq!(black.l, 0.0);

        let white = Lab::from(Rgb::WHITE);
        assert!((white.l - 100.0).abs() < 1e-3);
        assert!(white.a.abs() < 1e-3 && white.b.abs() < 1e-3);

        let red = Lab::from(Rgb::new(255, 0, 0));
        assert!((red.l - 53.24).abs() < 0.01, "red L = {}", red.l);
        assert!((red.a - 80.09).abs() < 0.01, "red a = {}", red.a);
        assert!((red.b - 67.20).abs() < 0.01, "red b = {}", red.b);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let rgb = Rgb::new(r as u8, g as u8, b as u8);
                    let back = Lab::from(rgb).to_rgb();
                    let drift = (back.r as i32 - rgb.r as i32)
                        .abs()
                        .max((back.g as i32 - rgb.g as i32).abs())
                        .max((back.b as i32 - rgb.b as i32).abs());
                    assert!(drift <= 1, "{rgb} came back as {back}");
                }
            }
        }
    }

    #[test]
    fn test_to_rgb_clamps_out_of_gamut() {
        let wild = Lab::new(50.0, 200.0, -200.0).to_rgb();
        assert_eq!(wild.g, 0);
        assert_eq!(Lab::new(120.0, 0.0, 0.0).to_rgb(), Rgb::WHITE);
    }
}

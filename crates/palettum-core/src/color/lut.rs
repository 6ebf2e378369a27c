//! Gamma lookup table access functions
//!
//! The tables are generated at compile time by build.rs.

include!(concat!(env!("OUT_DIR"), "/gamma_lut.rs"));

/// Decode an 8-bit sRGB channel to linear light (0.0..=1.0).
#[inline]
pub fn srgb_u8_to_linear(channel: u8) -> f64 {
    SRGB_U8_TO_LINEAR[channel as usize]
}

/// Encode a linear value (0.0..=1.0) to sRGB using the LUT with linear interpolation.
///
/// Out-of-range input is clamped, which is expected: Lab points produced by
/// blending can fall slightly outside the sRGB gamut.
#[inline]
pub fn linear_to_srgb(linear: f64) -> f64 {
    let linear = linear.clamp(0.0, 1.0);

    let scaled = linear * 4095.0;
    let index = scaled as usize;

    if index >= 4095 {
        return LINEAR_TO_SRGB[4095];
    }

    let frac = scaled - index as f64;
    let a = LINEAR_TO_SRGB[index];
    let b = LINEAR_TO_SRGB[index + 1];
    a + (b - a) * frac
}

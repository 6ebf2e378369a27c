//! Perceptual color difference formulas
//!
//! Three metrics of increasing cost and accuracy are available through
//! [`DiffFormula`]. All of them are pure functions of two Lab points,
//! symmetric for CIE76 and CIEDE2000, and zero for identical inputs.
//!
//! Note that distinct [`Rgb`](crate::Rgb) values can land on Lab points that
//! are closer than any formula resolves (for example the darkest near-black
//! values), so a zero distance means "identical in Lab", not "identical bytes".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Lab;
use crate::error::UnknownVariant;

/// 25^7, used by the chroma compensation terms of CIEDE2000
const POW25_7: f64 = 6_103_515_625.0;

/// Color difference formula used for nearest-color matching and for the
/// distances fed into smoothing kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiffFormula {
    /// Euclidean distance in Lab.
    #[serde(rename = "CIE76")]
    Cie76,
    /// Graphic-arts weighting of chroma and hue differences.
    #[serde(rename = "CIE94")]
    Cie94,
    /// Full CIEDE2000 with hue rotation term.
    #[default]
    #[serde(rename = "CIEDE2000")]
    Ciede2000,
}

impl DiffFormula {
    pub const ALL: [DiffFormula; 3] = [Self::Cie76, Self::Cie94, Self::Ciede2000];

    /// Compute the difference between two Lab colors.
    #[inline]
    pub fn delta_e(self, a: &Lab, b: &Lab) -> f64 {
        match self {
            DiffFormula::Cie76 => cie76(a, b),
            DiffFormula::Cie94 => cie94(a, b),
            DiffFormula::Ciede2000 => ciede2000(a, b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiffFormula::Cie76 => "CIE76",
            DiffFormula::Cie94 => "CIE94",
            DiffFormula::Ciede2000 => "CIEDE2000",
        }
    }
}

impl fmt::Display for DiffFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffFormula {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("diffFormula", s))
    }
}

/// CIE76: plain Euclidean distance.
pub fn cie76(c1: &Lab, c2: &Lab) -> f64 {
    let dl = c1.l - c2.l;
    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// CIE94 with graphic-arts constants (kL = 1, K1 = 0.045, K2 = 0.015).
///
/// Not symmetric: `c1` is the reference color whose chroma drives the
/// weighting functions.
pub fn cie94(c1: &Lab, c2: &Lab) -> f64 {
    const K1: f64 = 0.045;
    const K2: f64 = 0.015;

    let delta_l = c1.l - c2.l;
    let chroma1 = c1.chroma();
    let chroma2 = c2.chroma();
    let delta_c = chroma1 - chroma2;

    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    // Rounding can push the squared hue difference slightly negative
    let delta_h_sq = (da * da + db * db - delta_c * delta_c).max(0.0);

    let s_c = 1.0 + K1 * chroma1;
    let s_h = 1.0 + K2 * chroma1;

    let term_c = delta_c / s_c;
    (delta_l * delta_l + term_c * term_c + delta_h_sq / (s_h * s_h)).sqrt()
}

/// CIEDE2000 (Sharma, Wu & Dalal 2005) with kL = kC = kH = 1.
pub fn ciede2000(c1: &Lab, c2: &Lab) -> f64 {
    let c_bar = (c1.chroma() + c2.chroma()) * 0.5;
    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1_prime = c1.a * (1.0 + g);
    let a2_prime = c2.a * (1.0 + g);

    let c1_prime = a1_prime.hypot(c1.b);
    let c2_prime = a2_prime.hypot(c2.b);

    let h1_prime = hue_degrees(c1.b, a1_prime);
    let h2_prime = hue_degrees(c2.b, a2_prime);

    let delta_l_prime = c2.l - c1.l;
    let delta_c_prime = c2_prime - c1_prime;

    let chroma_product = c1_prime * c2_prime;
    let delta_h_prime = if chroma_product == 0.0 {
        0.0
    } else {
        let diff = h2_prime - h1_prime;
        if diff.abs() <= 180.0 {
            diff
        } else if diff > 180.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    };
    let delta_big_h_prime =
        2.0 * chroma_product.sqrt() * (delta_h_prime.to_radians() * 0.5).sin();

    let l_bar_prime = (c1.l + c2.l) * 0.5;
    let c_bar_prime = (c1_prime + c2_prime) * 0.5;

    let h_bar_prime = if chroma_product == 0.0 {
        h1_prime + h2_prime
    } else {
        let sum = h1_prime + h2_prime;
        if (h1_prime - h2_prime).abs() <= 180.0 {
            sum * 0.5
        } else if sum < 360.0 {
            (sum + 360.0) * 0.5
        } else {
            (sum - 360.0) * 0.5
        }
    };

    let t = 1.0 - 0.17 * (h_bar_prime - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_prime).to_radians().cos()
        + 0.32 * (3.0 * h_bar_prime + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_prime - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((h_bar_prime - 275.0) / 25.0).powi(2)).exp();
    let c_bar_prime7 = c_bar_prime.powi(7);
    let r_c = 2.0 * (c_bar_prime7 / (c_bar_prime7 + POW25_7)).sqrt();
    let r_t = -r_c * (2.0 * delta_theta).to_radians().sin();

    let l_offset_sq = (l_bar_prime - 50.0).powi(2);
    let s_l = 1.0 + (0.015 * l_offset_sq) / (20.0 + l_offset_sq).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_prime;
    let s_h = 1.0 + 0.015 * c_bar_prime * t;

    let term_l = delta_l_prime / s_l;
    let term_c = delta_c_prime / s_c;
    let term_h = delta_big_h_prime / s_h;

    (term_l * term_l + term_c * term_c + term_h * term_h + r_t * term_c * term_h)
        .max(0.0)
        .sqrt()
}

/// Hue angle in degrees, 0..360, defined as 0 on the neutral axis.
#[inline]
fn hue_degrees(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

//! Smoothing kernels for distance-weighted palette blending
//!
//! In `Smoothed` mode every palette color contributes to the output with a
//! weight that falls off with its perceptual distance from the source pixel.
//! `smoothStrength` widens the kernel: at 0.0 the nearest color dominates, at
//! 1.0 distant colors contribute substantially.
//!
//! Strength is first normalized as `t = clamp((s - 0.1) / 0.9, 0, 1)`, so the
//! bottom tenth of the range behaves like 0.1. Each kernel then interpolates
//! one parameter linearly in `t`:
//!
//! | Kernel   | Weight                         | Parameter at t=0 | at t=1 |
//! |----------|--------------------------------|------------------|--------|
//! | Idw      | `1 / (d^p + 1e-9)`             | p = 5            | p = 1  |
//! | Gaussian | `exp(-d² / 2σ²)`               | σ = 10           | σ = 50 |
//! | Rq       | `(1 + d² / (2αℓ²))^-α`, α = 1  | ℓ = 1            | ℓ = 30 |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

const DISTANCE_EPSILON: f64 = 1e-9;

const IDW_POWER: (f64, f64) = (5.0, 1.0);
const GAUSSIAN_SIGMA: (f64, f64) = (10.0, 50.0);
const RQ_LENGTH_SCALE: (f64, f64) = (1.0, 30.0);
const RQ_ALPHA: f64 = 1.0;

/// Weighting kernel used by `Smoothed` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SmoothFormula {
    /// Inverse distance weighting
    #[default]
    Idw,
    Gaussian,
    /// Rational quadratic
    Rq,
}

impl SmoothFormula {
    pub const ALL: [SmoothFormula; 3] = [Self::Idw, Self::Gaussian, Self::Rq];

    pub fn as_str(self) -> &'static str {
        match self {
            SmoothFormula::Idw => "Idw",
            SmoothFormula::Gaussian => "Gaussian",
            SmoothFormula::Rq => "Rq",
        }
    }
}

impl fmt::Display for SmoothFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmoothFormula {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("smoothFormula", s))
    }
}

/// A kernel with its strength-dependent parameter resolved.
///
/// Built once per frame so the per-pixel path only evaluates the weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothKernel {
    formula: SmoothFormula,
    param: f64,
}

impl SmoothKernel {
    pub fn new(formula: SmoothFormula, strength: f32) -> Self {
        let t = ((strength - 0.1) / 0.9).clamp(0.0, 1.0) as f64;
        let lerp = |(lo, hi): (f64, f64)| lo + (hi - lo) * t;
        let param = match formula {
            SmoothFormula::Idw => lerp(IDW_POWER),
            SmoothFormula::Gaussian => lerp(GAUSSIAN_SIGMA),
            SmoothFormula::Rq => lerp(RQ_LENGTH_SCALE),
        };
        Self { formula, param }
    }

    #[inline]
    pub fn formula(&self) -> SmoothFormula {
        self.formula
    }

    /// The resolved power, sigma or length scale.
    #[inline]
    pub fn param(&self) -> f64 {
        self.param
    }

    /// Unnormalized weight for a palette color at `distance`.
    #[inline]
    pub fn weight(&self, distance: f64) -> f64 {
        match self.formula {
            SmoothFormula::Idw => 1.0 / (distance.powf(self.param) + DISTANCE_EPSILON),
            SmoothFormula::Gaussian => {
                let sigma = self.param;
                (-(distance * distance) / (2.0 * sigma * sigma)).exp()
            }
            SmoothFormula::Rq => {
                let l = self.param;
                (1.0 + distance * distance / (2.0 * RQ_ALPHA * l * l)).powf(-RQ_ALPHA)
            }
        }
    }
}

//! Palette extraction by weighted k-means in Lab
//!
//! Pixels are sampled (at most [`MAX_SAMPLES`], seeded RNG), collapsed to
//! distinct colors with counts, and clustered with count-weighted k-means.
//! Seeding uses k-means++ so that well-separated colors are picked first.
//! The result is reproducible for a fixed seed.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::color::{Lab, Rgb};
use crate::error::ExtractError;
use crate::palette::MAX_PALETTE_SIZE;

/// Upper bound on pixels fed into clustering.
pub const MAX_SAMPLES: usize = 10_000;

/// Upper bound on assign/update rounds.
pub const MAX_ITERATIONS: usize = 32;

/// Seed used unless the caller overrides it.
pub const DEFAULT_SEED: u64 = 0x7061_6c65_7474_756d;

/// Pixels below this alpha are ignored when any opaque pixel exists.
const ALPHA_CUTOFF: u8 = 128;

/// Largest centroid movement (Lab units) that still counts as converged.
const CONVERGENCE_DELTA: f64 = 1e-3;

/// Configurable k-means palette extractor.
///
/// ```
/// use palettum_core::{Extractor, Rgb};
///
/// let pixels = [255, 0, 0, 255, 0, 0, 255, 255];
/// let colors = Extractor::new().extract(&pixels, 2, 1, 4).unwrap();
/// assert_eq!(colors.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    max_samples: usize,
    max_iterations: usize,
    seed: u64,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            max_samples: MAX_SAMPLES,
            max_iterations: MAX_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

impl Extractor {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Extract at most `k` colors from one RGBA frame.
    pub fn extract(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        k: usize,
    ) -> Result<Vec<Rgb>, ExtractError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ExtractError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        self.extract_frames(&[pixels], k)
    }

    /// Extract at most `k` colors from several RGBA frames sampled as one
    /// pixel population.
    ///
    /// Returns exactly `k` colors when the sample holds at least `k` distinct
    /// colors, otherwise every distinct color, most frequent first.
    pub fn extract_frames(&self, frames: &[&[u8]], k: usize) -> Result<Vec<Rgb>, ExtractError> {
        if k == 0 || k > MAX_PALETTE_SIZE {
            return Err(ExtractError::InvalidColorCount {
                requested: k,
                max: MAX_PALETTE_SIZE,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let (samples, transparent) = self.sample(frames, &mut rng);
        if samples.is_empty() {
            return Err(ExtractError::EmptyImage);
        }

        let distinct = count_distinct(&samples);
        // Hidden RGB under alpha 0 is not content; collapse it to one color
        if transparent {
            return Ok(distinct.into_iter().take(1).map(|(color, _)| color).collect());
        }
        if distinct.len() <= k {
            return Ok(distinct.into_iter().map(|(color, _)| color).collect());
        }

        Ok(self.cluster(&distinct, k, &mut rng))
    }

    /// Draw up to `max_samples` pixels, skipping transparent ones unless
    /// nothing else is left. The flag is set when every pixel was transparent.
    fn sample(&self, frames: &[&[u8]], rng: &mut StdRng) -> (Vec<Rgb>, bool) {
        let pixels = || frames.iter().flat_map(|f| f.chunks_exact(4));

        let opaque = pixels().filter(|px| px[3] >= ALPHA_CUTOFF).count();
        let keep_all = opaque == 0;
        let eligible = |px: &&[u8]| keep_all || px[3] >= ALPHA_CUTOFF;
        let population = if keep_all { pixels().count() } else { opaque };

        if population <= self.max_samples {
            let samples = pixels().filter(eligible).map(Rgb::from_slice).collect();
            return (samples, keep_all);
        }

        let mut chosen = index::sample(rng, population, self.max_samples).into_vec();
        chosen.sort_unstable();

        let mut next = chosen.into_iter().peekable();
        let mut samples = Vec::with_capacity(self.max_samples);
        for (i, px) in pixels().filter(eligible).enumerate() {
            match next.peek() {
                Some(&want) if want == i => {
                    samples.push(Rgb::from_slice(px));
                    next.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        (samples, keep_all)
    }

    fn cluster(&self, distinct: &[(Rgb, u32)], k: usize, rng: &mut StdRng) -> Vec<Rgb> {
        let points: Vec<Lab> = distinct.iter().map(|&(c, _)| Lab::from(c)).collect();
        let weights: Vec<f64> = distinct.iter().map(|&(_, n)| n as f64).collect();

        let mut centroids = seed_centroids(&points, &weights, k, rng);
        let mut assignments = vec![usize::MAX; points.len()];

        for _ in 0..self.max_iterations {
            let changed = assign(&points, &centroids, &mut assignments);
            if !changed {
                break;
            }
            let moved = update(&points, &weights, &assignments, &mut centroids);
            if moved < CONVERGENCE_DELTA {
                break;
            }
        }
        assign(&points, &centroids, &mut assignments);

        let mut population = vec![0.0f64; k];
        for (&cluster, &w) in assignments.iter().zip(&weights) {
            population[cluster] += w;
        }
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| population[b].total_cmp(&population[a]).then(a.cmp(&b)));

        let mut colors: Vec<Rgb> = Vec::with_capacity(k);
        for idx in order {
            let color = centroids[idx].to_rgb();
            if !colors.contains(&color) {
                colors.push(color);
            }
        }

        // Rounding can merge centroids; refill with the sampled colors
        // farthest from what is already chosen
        while colors.len() < k {
            let chosen: Vec<Lab> = colors.iter().map(|&c| Lab::from(c)).collect();
            let candidate = distinct
                .iter()
                .zip(&points)
                .filter(|((c, _), _)| !colors.contains(c))
                .map(|((c, _), p)| (*c, nearest(p, &chosen).1))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            match candidate {
                Some((color, _)) => colors.push(color),
                None => break,
            }
        }

        colors
    }
}

/// Distinct colors with their counts, most frequent first, ties by color.
fn count_distinct(samples: &[Rgb]) -> Vec<(Rgb, u32)> {
    let mut counts: HashMap<Rgb, u32> = HashMap::new();
    for &color in samples {
        *counts.entry(color).or_insert(0) += 1;
    }
    let mut distinct: Vec<(Rgb, u32)> = counts.into_iter().collect();
    distinct.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    distinct
}

#[inline]
fn distance_sq(a: &Lab, b: &Lab) -> f64 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    dl * dl + da * da + db * db
}

/// Index of and squared distance to the closest centroid.
#[inline]
fn nearest(point: &Lab, centroids: &[Lab]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = distance_sq(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// k-means++ seeding over weighted points. `points` must hold more than `k`
/// distinct entries.
fn seed_centroids(points: &[Lab], weights: &[f64], k: usize, rng: &mut StdRng) -> Vec<Lab> {
    let mut centroids = Vec::with_capacity(k);
    let mut taken = vec![false; points.len()];

    let first = pick_weighted(weights, rng).unwrap_or(0);
    centroids.push(points[first]);
    taken[first] = true;

    let mut closest: Vec<f64> = points.iter().map(|p| distance_sq(p, &points[first])).collect();

    while centroids.len() < k {
        let scores: Vec<f64> = closest
            .iter()
            .zip(weights)
            .zip(&taken)
            .map(|((&d, &w), &t)| if t { 0.0 } else { d * w })
            .collect();

        // Identical Lab points score zero; fall back to the first free one
        let next = pick_weighted(&scores, rng)
            .or_else(|| taken.iter().position(|&t| !t))
            .unwrap_or(0);

        centroids.push(points[next]);
        taken[next] = true;
        for (c, p) in closest.iter_mut().zip(points) {
            *c = c.min(distance_sq(p, &points[next]));
        }
    }

    centroids
}

fn pick_weighted(weights: &[f64], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut target = rng.gen::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            if target < w {
                return Some(i);
            }
            target -= w;
        }
    }
    weights.iter().rposition(|&w| w > 0.0)
}

/// Reassign every point; returns whether any assignment changed.
fn assign(points: &[Lab], centroids: &[Lab], assignments: &mut [usize]) -> bool {
    let next: Vec<usize> = points
        .par_iter()
        .map(|p| nearest(p, centroids).0)
        .collect();

    let changed = next.iter().zip(assignments.iter()).any(|(a, b)| a != b);
    assignments.copy_from_slice(&next);
    changed
}

/// Move centroids to their weighted means; returns the largest movement.
///
/// An empty cluster takes over the point farthest from its own centroid.
fn update(points: &[Lab], weights: &[f64], assignments: &[usize], centroids: &mut [Lab]) -> f64 {
    let k = centroids.len();
    let mut sums = vec![Lab::default(); k];
    let mut totals = vec![0.0f64; k];

    for ((p, &w), &cluster) in points.iter().zip(weights).zip(assignments) {
        sums[cluster].l += p.l * w;
        sums[cluster].a += p.a * w;
        sums[cluster].b += p.b * w;
        totals[cluster] += w;
    }

    let mut moved = 0.0f64;
    let mut reseeded = vec![false; points.len()];
    for cluster in 0..k {
        let next = if totals[cluster] > 0.0 {
            let t = totals[cluster];
            Lab::new(sums[cluster].l / t, sums[cluster].a / t, sums[cluster].b / t)
        } else {
            let far = points
                .iter()
                .zip(assignments)
                .enumerate()
                .filter(|(i, _)| !reseeded[*i])
                .map(|(i, (p, &c))| (i, distance_sq(p, &centroids[c])))
                .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
            match far {
                Some((i, _)) => {
                    reseeded[i] = true;
                    points[i]
                }
                None => centroids[cluster],
            }
        };
        moved = moved.max(distance_sq(&next, &centroids[cluster]).sqrt());
        centroids[cluster] = next;
    }
    moved
}

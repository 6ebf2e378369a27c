use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// IEC 61966-2-1 exact formula: sRGB to linear
fn srgb_to_linear_exact(srgb: f64) -> f64 {
    if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

/// IEC 61966-2-1 exact formula: linear to sRGB
fn linear_to_srgb_exact(linear: f64) -> f64 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

const NOISE_SIZE: usize = 64;
const NOISE_CELLS: usize = NOISE_SIZE * NOISE_SIZE;
const NOISE_SIGMA: f64 = 1.5;
const NOISE_RADIUS: isize = 6;

/// Energy field of a binary pattern on the 64x64 torus under a truncated
/// Gaussian kernel
struct Energy {
    kernel: Vec<(isize, isize, f64)>,
    field: Vec<f64>,
}

impl Energy {
    fn new() -> Self {
        let mut kernel = Vec::new();
        for dy in -NOISE_RADIUS..=NOISE_RADIUS {
            for dx in -NOISE_RADIUS..=NOISE_RADIUS {
                let r2 = (dx * dx + dy * dy) as f64;
                kernel.push((dy, dx, (-r2 / (2.0 * NOISE_SIGMA * NOISE_SIGMA)).exp()));
            }
        }
        Self {
            kernel,
            field: vec![0.0; NOISE_CELLS],
        }
    }

    fn splat(&mut self, p: usize, sign: f64) {
        let n = NOISE_SIZE as isize;
        let (y, x) = ((p / NOISE_SIZE) as isize, (p % NOISE_SIZE) as isize);
        for &(dy, dx, w) in &self.kernel {
            let q = ((y + dy).rem_euclid(n) * n + (x + dx).rem_euclid(n)) as usize;
            self.field[q] += sign * w;
        }
    }

    /// Set pixel with the highest energy
    fn tightest_cluster(&self, ones: &[bool]) -> usize {
        let mut best = (0, f64::NEG_INFINITY);
        for (p, &e) in self.field.iter().enumerate() {
            if ones[p] && e > best.1 {
                best = (p, e);
            }
        }
        best.0
    }

    /// Unset pixel with the lowest energy
    fn largest_void(&self, ones: &[bool]) -> usize {
        let mut best = (0, f64::INFINITY);
        for (p, &e) in self.field.iter().enumerate() {
            if !ones[p] && e < best.1 {
                best = (p, e);
            }
        }
        best.0
    }
}

/// Void-and-cluster threshold matrix: every value 0..=255 appears 16 times
fn void_and_cluster() -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut ones = vec![false; NOISE_CELLS];
    let mut placed = 0;
    while placed < NOISE_CELLS / 10 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let p = (state % NOISE_CELLS as u64) as usize;
        if !ones[p] {
            ones[p] = true;
            placed += 1;
        }
    }

    let mut energy = Energy::new();
    for p in 0..NOISE_CELLS {
        if ones[p] {
            energy.splat(p, 1.0);
        }
    }

    // Move the tightest cluster into the largest void until stable
    for _ in 0..10_000 {
        let cluster = energy.tightest_cluster(&ones);
        ones[cluster] = false;
        energy.splat(cluster, -1.0);
        let void = energy.largest_void(&ones);
        ones[void] = true;
        energy.splat(void, 1.0);
        if void == cluster {
            break;
        }
    }

    let initial = placed;
    let mut rank = vec![0usize; NOISE_CELLS];

    let mut pattern = ones.clone();
    let mut field = energy.field.clone();
    for r in (0..initial).rev() {
        let cluster = energy.tightest_cluster(&pattern);
        rank[cluster] = r;
        pattern[cluster] = false;
        energy.splat(cluster, -1.0);
    }

    std::mem::swap(&mut energy.field, &mut field);
    pattern = ones;
    for r in initial..NOISE_CELLS {
        let void = energy.largest_void(&pattern);
        rank[void] = r;
        pattern[void] = true;
        energy.splat(void, 1.0);
    }

    rank.into_iter().map(|r| (r * 256 / NOISE_CELLS) as u8).collect()
}

fn write_blue_noise(out_dir: &str) {
    let dest_path = Path::new(out_dir).join("blue_noise.rs");
    let mut file = File::create(&dest_path).unwrap();
    let values = void_and_cluster();

    writeln!(file, "#[rustfmt::skip]").unwrap();
    writeln!(
        file,
        "pub static BLUE_NOISE_64: [[u8; {NOISE_SIZE}]; {NOISE_SIZE}] = ["
    )
    .unwrap();
    for row in values.chunks(NOISE_SIZE) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(file, "    [{}],", cells.join(", ")).unwrap();
    }
    writeln!(file, "];").unwrap();
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    write_blue_noise(&out_dir);

    let dest_path = Path::new(&out_dir).join("gamma_lut.rs");
    let mut file = File::create(&dest_path).unwrap();

    // One exact entry per 8-bit channel value; decoding never interpolates
    writeln!(file, "/// Lookup table for 8-bit sRGB to linear conversion").unwrap();
    writeln!(file, "/// Index: channel byte, Value: linear value in 0.0..=1.0").unwrap();
    writeln!(file, "pub static SRGB_U8_TO_LINEAR: [f64; 256] = [").unwrap();
    for i in 0..256 {
        let linear = srgb_to_linear_exact(i as f64 / 255.0);
        if i > 0 && i % 4 == 0 {
            writeln!(file).unwrap();
        }
        write!(file, "    {:.17},", linear).unwrap();
    }
    writeln!(file, "\n];").unwrap();

    writeln!(file).unwrap();

    writeln!(file, "/// Lookup table for linear to sRGB conversion").unwrap();
    writeln!(file, "/// Index: linear value * 4095.0, Value: sRGB value").unwrap();
    writeln!(file, "pub static LINEAR_TO_SRGB: [f64; 4096] = [").unwrap();
    for i in 0..4096 {
        let linear = i as f64 / 4095.0;
        let srgb = linear_to_srgb_exact(linear);
        if i > 0 && i % 4 == 0 {
            writeln!(file).unwrap();
        }
        write!(file, "    {:.17},", srgb).unwrap();
    }
    writeln!(file, "\n];").unwrap();

    println!("cargo::rerun-if-changed=build.rs");
}

//! Error diffusion kernels and the rolling error buffer.
//!
//! Unlike blue noise, error diffusion depends on the pixels already mapped,
//! so a frame is walked serially in raster order. The quantization error of
//! each pixel is pushed onto neighbors that have not been visited yet.

/// An error diffusion kernel.
///
/// Each neighbor at `(dx, dy)` receives `error * weight / divisor`. `dy` is
/// never negative, and `max_dy + 1` rows of error are kept in flight.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    pub entries: &'static [(i32, i32, u8)],
    pub divisor: u8,
    pub max_dy: usize,
}

/// Floyd-Steinberg: 100% of the error over four neighbors.
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: Kernel = Kernel {
    entries: &[
        (1, 0, 7),  // right
        (-1, 1, 3), // bottom-left
        (0, 1, 5),  // bottom
        (1, 1, 1),  // bottom-right
    ],
    divisor: 16,
    max_dy: 1,
};

/// Per-channel error for the current row and the rows the kernel reaches.
#[derive(Debug, Clone)]
pub struct ErrorBuffer {
    /// rows[0] is the current row
    rows: Vec<Vec<[f32; 3]>>,
    width: usize,
}

impl ErrorBuffer {
    pub fn new(width: usize, kernel: &Kernel) -> Self {
        Self {
            rows: (0..=kernel.max_dy).map(|_| vec![[0.0; 3]; width]).collect(),
            width,
        }
    }

    /// Error accumulated so far for column `x` of the current row.
    #[inline]
    pub fn accumulated(&self, x: usize) -> [f32; 3] {
        self.rows[0][x]
    }

    /// Spread `error` from column `x` of the current row. Neighbors outside
    /// the frame are dropped.
    pub fn diffuse(&mut self, x: usize, error: [f32; 3], kernel: &Kernel) {
        let divisor = kernel.divisor as f32;
        for &(dx, dy, weight) in kernel.entries {
            let nx = x as i64 + dx as i64;
            let row = dy as usize;
            if nx < 0 || nx as usize >= self.width || row >= self.rows.len() {
                continue;
            }
            let cell = &mut self.rows[row][nx as usize];
            for c in 0..3 {
                cell[c] += error[c] * weight as f32 / divisor;
            }
        }
    }

    /// Move to the next row. The last row starts out empty.
    pub fn advance_row(&mut self) {
        self.rows.rotate_left(1);
        if let Some(last) = self.rows.last_mut() {
            last.fill([0.0; 3]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floyd_steinberg_propagates_all_error() {
        let total: u32 = FLOYD_STEINBERG.entries.iter().map(|e| e.2 as u32).sum();
        assert_eq!(total, FLOYD_STEINBERG.divisor as u32);
    }

    #[test]
    fn test_diffuse_and_advance() {
        let mut buf = ErrorBuffer::new(3, &FLOYD_STEINBERG);
        buf.diffuse(1, [16.0, -32.0, 0.0], &FLOYD_STEINBERG);
        assert_eq!(buf.accumulated(2), [7.0, -14.0, 0.0]);
        assert_eq!(buf.accumulated(0), [0.0; 3]);

        buf.advance_row();
        assert_eq!(buf.accumulated(0), [3.0, -6.0, 0.0]);
        assert_eq!(buf.accumulated(1), [5.0, -10.0, 0.0]);
        assert_eq!(buf.accumulated(2), [1.0, -2.0, 0.0]);

        buf.advance_row();
        assert_eq!(buf.accumulated(1), [0.0; 3]);
    }

    #[test]
    fn test_edges_drop_error() {
        let mut buf = ErrorBuffer::new(2, &FLOYD_STEINBERG);
        buf.diffuse(0, [16.0; 3], &FLOYD_STEINBERG);
        buf.diffuse(1, [16.0; 3], &FLOYD_STEINBERG);
        buf.advance_row();
        // Column 0 gets 5 from itself and 3 from column 1; column 1 gets 1 + 5
        assert_eq!(buf.accumulated(0), [8.0; 3]);
        assert_eq!(buf.accumulated(1), [6.0; 3]);
    }
}

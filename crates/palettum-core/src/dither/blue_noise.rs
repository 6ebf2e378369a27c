//! Blue noise threshold texture.
//!
//! A 64x64 void-and-cluster rank matrix generated by the build script. It
//! tiles seamlessly, every threshold 0..=255 appears exactly 16 times and
//! neighboring cells differ strongly, so any threshold level produces evenly
//! spread dots rather than clumps or a visible grid.

/// Side length of the tile.
pub const SIZE: usize = 64;

include!(concat!(env!("OUT_DIR"), "/blue_noise.rs"));

//! Deterministic colour palette for debug overlays.
//!
//! The palette is a pure function of its seed, so two calls with the same
//! seed always agree and no process-wide random state is involved.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when none is configured.
pub const DEFAULT_PALETTE_SEED: u64 = 200;

/// Returns `len` colours for `seed`. Index 0 is black (background); the
/// remaining channels are drawn from the upper 70% of the range so labels
/// stay visible on dark frames.
pub fn palette(seed: u64, len: usize) -> Vec<[u8; 3]> {
    let mut colors = Vec::with_capacity(len);
    if len == 0 {
        return colors;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    colors.push([0, 0, 0]);
    for _ in 1..len {
        colors.push([channel(&mut rng), channel(&mut rng), channel(&mut rng)]);
    }
    colors
}

/// Colour of a single label.
pub fn palette_color(seed: u64, index: usize) -> [u8; 3] {
    palette(seed, index + 1).last().copied().unwrap_or([0, 0, 0])
}

fn channel(rng: &mut StdRng) -> u8 {
    ((rng.gen::<f32>() * 0.7 + 0.3) * 255.0) as u8
}

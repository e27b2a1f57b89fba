//! Small random pixel nudges applied between grid relocations.
//!
//! ## Rust concepts
//! - Generic structs with a default type parameter (`R = StdRng`)
//! - `Rng::gen_range` for picking an index into a fixed set

use crate::Offset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Jitter steps per axis. Zero is left out so the clock always moves.
pub const JITTER_STEPS: [i32; 4] = [-2, -1, 1, 2];

/// Produces offsets with both components drawn from [`JITTER_STEPS`].
pub struct JitterGenerator<R: Rng = StdRng> {
    rng: R,
}

impl JitterGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator, for tests and reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for JitterGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> JitterGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Next jitter offset. Never `(0, 0)`; may repeat the previous value.
    pub fn next_offset(&mut self) -> Offset {
        Offset::new(self.step(), self.step())
    }

    fn step(&mut self) -> i32 {
        JITTER_STEPS[self.rng.gen_range(0..JITTER_STEPS.len())]
    }
}

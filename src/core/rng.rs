// Seeded random number generator

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source for ability picks and glide/flap timing.
///
/// Seeded instances replay the same sequence, which keeps tests and
/// recorded sessions deterministic.
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: StdRng,
    seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// The seed used to build this generator, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Random f32 in [min, max]. Returns `min` for empty ranges.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Random index in [0, len), `None` when `len` is zero
    pub fn index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

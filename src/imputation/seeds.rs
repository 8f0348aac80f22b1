//! Seed streams for imputation repetitions

use crate::error::{ImputeError, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Source of per-repetition seeds
pub trait SeedSource: Send {
    /// Next seed in the stream
    fn next_seed(&mut self) -> u64;

    /// Draw `n` seeds in order
    fn take_seeds(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.next_seed()).collect()
    }
}

impl<S: SeedSource + ?Sized> SeedSource for &mut S {
    fn next_seed(&mut self) -> u64 {
        (**self).next_seed()
    }
}

/// Uniform seeds drawn from a random number generator
#[derive(Debug, Clone)]
pub struct RandomSeeds<R: Rng + Send = ChaCha8Rng> {
    rng: R,
}

impl<R: Rng + Send> RandomSeeds<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSeeds<ChaCha8Rng> {
    /// Seeds from an entropy-seeded generator
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    /// Reproducible seed stream
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SeedSource for RandomSeeds<R> {
    fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// Fixed seed sequence, repeated cyclically
#[derive(Debug, Clone)]
pub struct FixedSeeds {
    seeds: Vec<u64>,
    cursor: usize,
}

impl FixedSeeds {
    pub fn new(seeds: Vec<u64>) -> Result<Self> {
        if seeds.is_empty() {
            return Err(ImputeError::InvalidParameter {
                name: "seeds".to_string(),
                value: "[]".to_string(),
                reason: "at least one seed is required".to_string(),
            });
        }
        Ok(Self { seeds, cursor: 0 })
    }

    /// Rewind to the first seed
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl SeedSource for FixedSeeds {
    fn next_seed(&mut self) -> u64 {
        let seed = self.seeds[self.cursor % self.seeds.len()];
        self.cursor += 1;
        seed
    }
}

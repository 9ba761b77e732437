//! Seeded Random Source
//!
//! All randomness in the crate (weight initialisation, the training shuffle,
//! cross-validation folds) is drawn from a [`SeededRng`] that the caller
//! constructs with an explicit seed and passes in by `&mut`. There is no
//! global generator, so two runs with the same seeds produce the same
//! weights and the same batch order.
//!
//! The generator itself is `rand`'s `StdRng`; normal samples come from
//! `rand_distr::StandardNormal`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Deterministic random generator owned by the call site that created it.
#[derive(Clone, Debug)]
pub struct SeededRng {
    inner: StdRng,
    seed: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics if `bound == 0`.
    pub fn next(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "SeededRng::next: bound must be positive");
        self.inner.random_range(0..bound)
    }

    /// Uniform float in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Standard normal sample.
    pub fn normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }
}

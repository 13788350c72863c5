//! Random number generator abstraction for determinism.
//!
//! Every probabilistic rule (accuracy, crits, status rolls, flee, AI jitter)
//! draws from an injected `DeterministicRng`. In production this wraps a
//! seedable `StdRng`; in tests a scripted implementation is injected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Generate a percentile draw in `[0.0, 100.0)`.
    ///
    /// A chance of `p` percent succeeds when the draw is below `p`.
    fn roll_percent(&mut self) -> f64 {
        self.next_f64() * 100.0
    }
}

/// Production RNG backed by `rand`'s `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: StdRng,
}

impl SeededRng {
    /// Creates an RNG with a fixed seed, for replays and reproducible runs.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates an RNG seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }
}

impl DeterministicRng for SeededRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.inner.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.inner.random::<f64>()
    }
}

//! Progress increment sources.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the amount progress grows by on each download tick.
pub trait ProgressIncrement: Send + 'static {
    /// Next increment in percentage points. Negative values are treated as 0.
    fn next_increment(&mut self) -> f64;
}

/// Uniformly random increments in `[min, max)`.
///
/// Bounds are normalized on construction: a non-finite or negative `min`
/// becomes 0 and a non-finite or smaller `max` collapses to `min`.
#[derive(Debug)]
pub struct RandomIncrement {
    rng: StdRng,
    min: f64,
    max: f64,
}

impl RandomIncrement {
    /// Create a source seeded from the OS.
    pub fn new(min: f64, max: f64) -> Self {
        Self::with_rng(StdRng::from_os_rng(), min, max)
    }

    /// Create a reproducible source.
    pub fn seeded(seed: u64, min: f64, max: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), min, max)
    }

    fn with_rng(rng: StdRng, min: f64, max: f64) -> Self {
        let min = if min.is_finite() { min.max(0.0) } else { 0.0 };
        let max = if max.is_finite() { max.max(min) } else { min };
        Self { rng, min, max }
    }
}

impl ProgressIncrement for RandomIncrement {
    fn next_increment(&mut self) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        self.rng.random_range(self.min..self.max)
    }
}

/// Constant increment.
#[derive(Debug, Clone, Copy)]
pub struct FixedIncrement(pub f64);

impl ProgressIncrement for FixedIncrement {
    fn next_increment(&mut self) -> f64 {
        self.0
    }
}

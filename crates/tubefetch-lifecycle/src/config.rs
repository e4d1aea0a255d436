//! Lifecycle timing configuration.

use std::time::Duration;

use tracing::warn;

use crate::increment::RandomIncrement;

/// Stage timings and progress increment bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleConfig {
    /// Delay spent in `preparing` before downloading starts
    pub preparing_delay: Duration,
    /// Interval between progress ticks while downloading
    pub tick_interval: Duration,
    /// Delay spent in `converting` before completion
    pub converting_delay: Duration,
    /// Lower bound (inclusive) of a progress increment
    pub min_increment: f64,
    /// Upper bound (exclusive) of a progress increment
    pub max_increment: f64,
    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            preparing_delay: Duration::from_millis(1500),
            tick_interval: Duration::from_millis(500),
            converting_delay: Duration::from_millis(2000),
            min_increment: 1.0,
            max_increment: 15.0,
            seed: None,
        }
    }
}

impl LifecycleConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup; unset or unparsable keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_millis)
        };
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        Self {
            preparing_delay: millis("SIM_PREPARING_MS").unwrap_or(defaults.preparing_delay),
            tick_interval: millis("SIM_TICK_MS").unwrap_or(defaults.tick_interval),
            converting_delay: millis("SIM_CONVERTING_MS").unwrap_or(defaults.converting_delay),
            min_increment: number("SIM_MIN_INCREMENT").unwrap_or(defaults.min_increment),
            max_increment: number("SIM_MAX_INCREMENT").unwrap_or(defaults.max_increment),
            seed: lookup("SIM_SEED").and_then(|s| s.trim().parse().ok()),
        }
        .sanitized()
    }

    /// Replace increment bounds that cannot drive a run.
    ///
    /// Non-finite bounds fall back to the defaults, `min` is at least 0 and
    /// `max` is at least `min`.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let min = if self.min_increment.is_finite() {
            self.min_increment.max(0.0)
        } else {
            warn!(value = self.min_increment, "Ignoring non-finite SIM_MIN_INCREMENT");
            defaults.min_increment
        };
        let mut max = if self.max_increment.is_finite() {
            self.max_increment
        } else {
            warn!(value = self.max_increment, "Ignoring non-finite SIM_MAX_INCREMENT");
            defaults.max_increment
        };
        if max < min {
            warn!(min, max, "Increment bounds inverted, using min for both");
            max = min;
        }
        Self {
            min_increment: min,
            max_increment: max,
            ..self
        }
    }

    /// Build the random increment source described by this config.
    pub fn increment_source(&self) -> RandomIncrement {
        match self.seed {
            Some(seed) => RandomIncrement::seeded(seed, self.min_increment, self.max_increment),
            None => RandomIncrement::new(self.min_increment, self.max_increment),
        }
    }

    /// Upper bound on the simulated duration of one run.
    ///
    /// `None` when increments may be zero, since progress is then unbounded
    /// in time.
    pub fn max_run_duration(&self) -> Option<Duration> {
        if !self.min_increment.is_finite() || self.min_increment <= 0.0 {
            return None;
        }
        // One tick per increment to reach 100, plus the tick that converts.
        let ticks = (100.0 / self.min_increment).ceil() as u32 + 1;
        Some(self.preparing_delay + self.tick_interval * ticks + self.converting_delay)
    }
}

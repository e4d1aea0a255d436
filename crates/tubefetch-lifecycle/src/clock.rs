//! Clock abstraction for timer-driven stages.
//!
//! Production code sleeps on tokio timers. Tests use [`VirtualClock`], whose
//! sleeps return immediately after advancing virtual time, so a full run
//! completes deterministically without wall-clock delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Source of time and delays.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: tokio::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests.
///
/// Virtual time is the sum of every requested sleep.
#[derive(Debug, Default)]
pub struct VirtualClock {
    elapsed_nanos: AtomicU64,
    sleeps: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps performed so far.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }

    /// Move virtual time forward without sleeping.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_virtual_clock_accumulates_sleeps() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.sleep(Duration::from_millis(1500)).await;
        clock.sleep(Duration::from_millis(500)).await;

        assert_eq!(clock.now(), Duration::from_millis(2000));
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_sleeps_on_tokio_timer() {
        let clock = SystemClock::new();
        clock.sleep(Duration::from_secs(5)).await;
        assert!(clock.now() >= Duration::from_secs(5));
    }
}

//! Injectable time sources for deterministic testing
//!
//! Record timestamps and retry backoff both consume time through this trait
//! so tests can run against a controlled clock instead of the wall.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstract time source. Production uses system time; tests advance a
/// simulated clock manually.
pub trait TimeSource: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now_unix(&self) -> u64;
}

/// Real system time source.
#[derive(Debug, Clone, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Create a new system time source.
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Simulated time source with manual control of progression.
#[derive(Debug, Clone)]
pub struct SimulatedTimeSource {
    current: Arc<AtomicU64>,
}

impl SimulatedTimeSource {
    /// Create a simulated source starting at the given timestamp.
    pub fn new(initial_timestamp: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(initial_timestamp)),
        }
    }

    /// Create starting at a fixed recent time (2025-01-01 00:00:00 UTC).
    pub fn from_recent() -> Self {
        Self::new(1_735_689_600)
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance(&self, seconds: u64) {
        self.current.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_unix(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_time_advances_on_demand() {
        let clock = SimulatedTimeSource::new(1000);
        assert_eq!(clock.now_unix(), 1000);
        clock.advance(60);
        assert_eq!(clock.now_unix(), 1060);
    }

    #[test]
    fn clones_share_the_clock() {
        let clock = SimulatedTimeSource::new(0);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_unix(), 5);
    }

    #[test]
    fn system_time_is_after_2024() {
        assert!(SystemTimeSource::new().now_unix() > 1_704_067_200);
    }
}

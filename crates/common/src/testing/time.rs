//! Settable clock for deterministic tests

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::time::Clock;

/// Mock clock for deterministic testing
///
/// Clones share the same timeline, so a test can keep one handle and hand
/// another to the code under test.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    wall_start: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Clock whose wall time starts at `secs` after the Unix epoch
    pub fn at_unix(secs: u64) -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn starting_at(wall_start: SystemTime) -> Self {
        Self { start: Instant::now(), wall_start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.wall_start + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_timeline() {
        let clock = MockClock::at_unix(1_000);
        let handle = clock.clone();

        handle.advance_secs(30);
        assert_eq!(clock.unix_seconds(), 1_030);
        assert_eq!(clock.now().duration_since(clock.start), Duration::from_secs(30));
    }
}

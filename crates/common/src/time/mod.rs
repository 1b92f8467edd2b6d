//! Clock abstraction
//!
//! Token expiry compares Unix seconds, so everything that checks expiry
//! takes a [`Clock`] instead of reading the system time directly.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Whole seconds since the Unix epoch
    fn unix_seconds(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

//! Wall-clock abstraction for testability.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time.
///
/// Production code uses [`SystemClock`]; tests use [`MockClock`] to move
/// time forward without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient cloning
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same underlying time, so a test can hand one clone to a
/// service and advance another.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock frozen at the real current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock frozen at `start`
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Create a mock clock at the given UNIX timestamp (seconds)
    pub fn at_timestamp(secs: i64) -> Self {
        let start = Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now);
        Self::at(start)
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        let mut current = self.current.lock();
        *current += delta;
    }

    /// Advance the mock clock by whole seconds
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Set the mock clock to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_advances_shared_time() {
        let clock = MockClock::at_timestamp(1_700_000_000);
        let observer = clock.clone();

        clock.advance_secs(300);

        assert_eq!(observer.now().timestamp(), 1_700_000_300);
        assert_eq!(observer.millis_since_epoch(), 1_700_000_300_000);
    }

    #[test]
    fn arc_clock_delegates() {
        let clock = Arc::new(MockClock::at_timestamp(42));
        assert_eq!(clock.now().timestamp(), 42);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}

//! Time source for the registry.
//!
//! Every operation that stamps a record or compares against a deadline
//! reads the injected [`Clock`]. Production uses [`SystemClock`]; tests
//! drive a [`ManualClock`] forward explicitly.

use std::sync::Arc;

use ccv_core::Timestamp;
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time, truncated to seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: Timestamp) {
        *self.now.lock() = at;
    }

    /// Move forward by `secs`.
    pub fn advance_secs(&self, secs: u64) {
        let mut now = self.now.lock();
        *now = now.saturating_add_secs(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let start = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        clock.advance_secs(60);
        assert_eq!(other.now().epoch_secs(), 1_700_000_060);
    }

    #[test]
    fn system_clock_has_no_subsecond_part() {
        let now = SystemClock.now();
        assert_eq!(now.as_datetime().timestamp_subsec_nanos(), 0);
    }
}

//! Clock abstraction
//!
//! Server-assigned cell timestamps ("write at now") must resolve at the
//! moment of application, not at request-construction time. The mutation
//! engine takes the clock by injection so tests can supply deterministic
//! timestamps instead of wall-clock time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in microseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_micros: i64) -> Self {
        Self {
            now: AtomicI64::new(now_micros),
        }
    }

    /// Move the clock forward.
    pub fn advance_micros(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_micros(&self, now_micros: i64) {
        self.now.store(now_micros, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_micros(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

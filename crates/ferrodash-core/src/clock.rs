//! Wall-clock source used for cache expiry and backoff windows.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::{Date, OffsetDateTime};

/// Source of the current UTC time.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// `at + by`, clamped to the last representable date instead of overflowing.
///
/// Upstream `Retry-After` values and caller TTLs are unbounded, so expiry and
/// backoff deadlines go through here.
pub fn saturating_add(at: OffsetDateTime, by: Duration) -> OffsetDateTime {
    time::Duration::try_from(by)
        .ok()
        .and_then(|delta| at.checked_add(delta))
        .unwrap_or_else(|| Date::MAX.midnight().assume_utc())
}

/// Reads the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for deterministic expiry tests.
///
/// Clones share the same instant, so a test can hand one clone to a
/// coordinator and keep another to move time forward.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now = saturating_add(*now, by);
    }

    pub fn set(&self, instant: OffsetDateTime) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("manual clock lock is not poisoned")
    }
}

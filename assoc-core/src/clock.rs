//! Time sources.
//!
//! Association creation times are assigned by the store, never by the
//! caller. Routing them through a [`Clock`] keeps ordering tests
//! deterministic.

use chrono::{Duration, Utc};
use std::fmt;
use std::sync::Mutex;

use crate::identity::{truncate_to_micros, Timestamp};

/// Source of server-assigned timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time, truncated to microsecond precision.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        truncate_to_micros(Utc::now())
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(truncate_to_micros(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Timestamp) {
        if let Ok(mut current) = self.current.lock() {
            *current = truncate_to_micros(to);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        // A poisoned lock still holds the last value written.
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

//! Time sources for composed report text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A timestamp and its unit label, rendered as `<value><unit>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub value: u64,
    pub unit: &'static str,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Source of the current time embedded in composed messages.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Simulation clock advanced explicitly by its owner, in nanoseconds.
#[derive(Debug, Default)]
pub struct ManualClock {
    ns: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            ns: AtomicU64::new(start_ns),
        }
    }

    pub fn set(&self, ns: u64) {
        self.ns.store(ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: u64) {
        self.ns.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp {
            value: self.ns.load(Ordering::SeqCst),
            unit: "NS",
        }
    }
}

/// Wall-clock nanoseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    started: DateTime<Utc>,
}

impl WallClock {
    pub fn new() -> Self {
        Self { started: Utc::now() }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now(&self) -> Timestamp {
        let elapsed = Utc::now() - self.started;
        let ns = elapsed.num_nanoseconds().unwrap_or(i64::MAX).max(0);
        Timestamp {
            value: u64::try_from(ns).unwrap_or(0),
            unit: "NS",
        }
    }
}

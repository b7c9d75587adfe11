//! Quit-count escalation state machine.
//!
//! Tracks COUNT actions against a configurable maximum. A maximum of 0 means
//! unlimited; once a maximum is set as non-overridable it is frozen.

use serde::Serialize;

/// Quit count, its maximum, and the override lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuitCounter {
    quit_count: u64,
    max_quit_count: u64,
    overridable: bool,
}

impl Default for QuitCounter {
    fn default() -> Self {
        Self {
            quit_count: 0,
            max_quit_count: 0,
            overridable: true,
        }
    }
}

impl QuitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.quit_count
    }

    pub fn max(&self) -> u64 {
        self.max_quit_count
    }

    pub fn is_overridable(&self) -> bool {
        self.overridable
    }

    /// Set the maximum (negative clamps to 0) and whether it may change later.
    ///
    /// Returns `false`, leaving everything unchanged, if a previous call locked
    /// the maximum.
    pub fn set_max(&mut self, count: i64, overridable: bool) -> bool {
        if !self.overridable {
            return false;
        }
        self.overridable = overridable;
        self.max_quit_count = u64::try_from(count).unwrap_or(0);
        true
    }

    /// Set the current count; negative clamps to 0.
    pub fn set(&mut self, count: i64) {
        self.quit_count = u64::try_from(count).unwrap_or(0);
    }

    pub fn increment(&mut self) {
        self.quit_count += 1;
    }

    pub fn reset(&mut self) {
        self.quit_count = 0;
    }

    /// `quit_count >= max_quit_count`, except that an unlimited maximum (0)
    /// is never reached.
    pub fn is_reached(&self) -> bool {
        self.max_quit_count != 0 && self.quit_count >= self.max_quit_count
    }

    /// Apply one COUNT action: a no-op when unlimited, otherwise increment
    /// and report whether the maximum is now reached.
    pub fn on_count_action(&mut self) -> bool {
        if self.max_quit_count == 0 {
            return false;
        }
        self.increment();
        self.is_reached()
    }
}

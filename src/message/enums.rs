//! Severity and verbosity enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{Error, Result};

/// Fixed-domain classification of a report.
///
/// Ordering follows escalation: `Info < Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Every severity, in escalation order.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Display name used in composed messages and summaries.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Info => "UVM_INFO",
            Severity::Warning => "UVM_WARNING",
            Severity::Error => "UVM_ERROR",
            Severity::Fatal => "UVM_FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = Error;

    /// Accepts `UVM_ERROR` or `error`, case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("UVM_").unwrap_or(&upper);
        match bare {
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "FATAL" => Ok(Severity::Fatal),
            _ => Err(Error::validation(format!("unknown severity: {s}"))),
        }
    }
}

/// Numeric verbosity level of a report.
///
/// Only used for the optional `(verbosity)` annotation in composed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Verbosity(pub i32);

impl Verbosity {
    pub const NONE: Verbosity = Verbosity(0);
    pub const LOW: Verbosity = Verbosity(100);
    pub const MEDIUM: Verbosity = Verbosity(200);
    pub const HIGH: Verbosity = Verbosity(300);
    pub const FULL: Verbosity = Verbosity(400);
    pub const DEBUG: Verbosity = Verbosity(500);

    /// Name of a standard level, `None` for custom values.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("UVM_NONE"),
            100 => Some("UVM_LOW"),
            200 => Some("UVM_MEDIUM"),
            300 => Some("UVM_HIGH"),
            400 => Some("UVM_FULL"),
            500 => Some("UVM_DEBUG"),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::MEDIUM
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

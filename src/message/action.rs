//! Action bitmask.
//!
//! Each bit selects one effect of `ReportServer::execute`. Bit values match the
//! classic report-handler encoding so masks can be exchanged numerically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use super::enums::Severity;
use crate::types::{Error, Result};

/// Set of effects a report triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(u32);

impl Action {
    pub const NONE: Action = Action(0);
    pub const DISPLAY: Action = Action(1);
    pub const LOG: Action = Action(2);
    pub const COUNT: Action = Action(4);
    pub const EXIT: Action = Action(8);
    // 16 is reserved for the user-hook action, which this server does not dispatch.
    pub const STOP: Action = Action(32);
    pub const RECORD: Action = Action(64);

    const NAMED: [(Action, &'static str); 6] = [
        (Action::DISPLAY, "DISPLAY"),
        (Action::LOG, "LOG"),
        (Action::COUNT, "COUNT"),
        (Action::EXIT, "EXIT"),
        (Action::STOP, "STOP"),
        (Action::RECORD, "RECORD"),
    ];

    const KNOWN_BITS: u32 = 1 | 2 | 4 | 8 | 32 | 64;

    /// Build a mask from raw bits, dropping bits with no meaning here.
    pub const fn from_bits(bits: u32) -> Self {
        Action(bits & Self::KNOWN_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Default actions a producer attaches for a severity.
    pub fn default_for(severity: Severity) -> Self {
        match severity {
            Severity::Info | Severity::Warning => Action::DISPLAY,
            Severity::Error => Action::DISPLAY | Action::COUNT,
            Severity::Fatal => Action::DISPLAY | Action::EXIT,
        }
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Action) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: Action) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Action) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Action) {
        self.0 &= !other.0;
    }
}

impl BitOr for Action {
    type Output = Action;

    fn bitor(self, rhs: Action) -> Action {
        Action(self.0 | rhs.0)
    }
}

impl BitOrAssign for Action {
    fn bitor_assign(&mut self, rhs: Action) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Action {
    type Output = Action;

    fn bitand(self, rhs: Action) -> Action {
        Action(self.0 & rhs.0)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (bit, name) in Self::NAMED {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for Action {
    type Err = Error;

    /// Parses `DISPLAY|LOG` style masks or a numeric mask; `NONE` and the
    /// empty string are empty.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(bits) = s.trim().parse::<u32>() {
            return Ok(Action::from_bits(bits));
        }
        let mut action = Action::NONE;
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            let upper = part.to_ascii_uppercase();
            let bare = upper.strip_prefix("UVM_").unwrap_or(&upper);
            if bare == "NONE" || bare == "NO_ACTION" {
                continue;
            }
            let bit = Self::NAMED
                .iter()
                .find(|(_, name)| *name == bare || (bare == "RM_RECORD" && *name == "RECORD"))
                .map(|(bit, _)| *bit)
                .ok_or_else(|| Error::validation(format!("unknown action: {part}")))?;
            action |= bit;
        }
        Ok(action)
    }
}

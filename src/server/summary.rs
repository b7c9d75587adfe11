//! Report summary text and server state snapshots.

use serde::Serialize;
use std::fmt::{self, Write as _};

use super::counters::Counters;
use super::quit::QuitCounter;
use crate::message::Severity;
use crate::types::Result;

/// Render the end-of-run summary.
///
/// `ids` is `None` when the id block is disabled.
pub fn render_summary(
    quit: &QuitCounter,
    severities: &Counters<Severity>,
    ids: Option<&Counters<String>>,
) -> String {
    let mut out = String::from("\n--- UVM Report Summary ---\n\n");

    if quit.max() != 0 {
        if quit.is_reached() {
            out.push_str("Quit count reached!\n");
        }
        let _ = writeln!(out, "Quit count : {} of {}", quit.count(), quit.max());
    }

    out.push_str("** Report counts by severity\n");
    for (severity, count) in severities.iter() {
        let _ = writeln!(out, "{} : {}", severity.name(), count);
    }

    if let Some(ids) = ids {
        out.push_str("** Report counts by id\n");
        for (id, count) in ids.iter() {
            let _ = writeln!(out, "[{id}] {count}");
        }
    }
    out
}

/// Point-in-time view of a server's counters and switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSnapshot {
    pub name: String,
    pub quit_count: u64,
    pub max_quit_count: u64,
    pub max_quit_overridable: bool,
    pub severity_count: Counters<Severity>,
    pub id_count: Counters<String>,
    pub enable_id_summary: bool,
    pub record_all_messages: bool,
    pub show_verbosity: bool,
    pub show_terminator: bool,
}

impl ServerSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  quit_count: {}", self.quit_count)?;
        writeln!(f, "  max_quit_count: {}", self.max_quit_count)?;
        writeln!(f, "  max_quit_overridable: {}", u8::from(self.max_quit_overridable))?;
        if !self.severity_count.is_empty() {
            writeln!(f, "  severity_count: {} entries", self.severity_count.len())?;
            for (severity, count) in self.severity_count.iter() {
                writeln!(f, "    [{}]: {}", severity.name(), count)?;
            }
        }
        if !self.id_count.is_empty() {
            writeln!(f, "  id_count: {} entries", self.id_count.len())?;
            for (id, count) in self.id_count.iter() {
                writeln!(f, "    [{id}]: {count}")?;
            }
        }
        writeln!(f, "  enable_id_summary: {}", u8::from(self.enable_id_summary))?;
        writeln!(f, "  record_all_messages: {}", u8::from(self.record_all_messages))?;
        writeln!(f, "  show_verbosity: {}", u8::from(self.show_verbosity))?;
        write!(f, "  show_terminator: {}", u8::from(self.show_terminator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn severity_counts(info: i64, error: i64) -> Counters<Severity> {
        let mut counts = Counters::zeroed_severities();
        counts.set(Severity::Info, info);
        counts.set(Severity::Error, error);
        counts
    }

    #[test]
    fn test_summary_unlimited_without_ids() {
        let text = render_summary(&QuitCounter::new(), &severity_counts(3, 1), None);
        assert_eq!(
            text,
            "\n--- UVM Report Summary ---\n\n\
             ** Report counts by severity\n\
             UVM_INFO : 3\n\
             UVM_WARNING : 0\n\
             UVM_ERROR : 1\n\
             UVM_FATAL : 0\n"
        );
    }

    #[test]
    fn test_summary_with_quit_and_ids() {
        let mut quit = QuitCounter::new();
        quit.set_max(2, true);
        quit.set(2);

        let mut ids = Counters::new();
        ids.set("B".to_string(), 1);
        ids.set("A".to_string(), 3);

        let text = render_summary(&quit, &severity_counts(3, 1), Some(&ids));
        assert!(text.contains("Quit count reached!\nQuit count : 2 of 2\n"));
        assert!(text.ends_with("** Report counts by id\n[A] 3\n[B] 1\n"));
    }

    #[test]
    fn test_summary_quit_not_reached() {
        let mut quit = QuitCounter::new();
        quit.set_max(5, true);
        quit.set(1);

        let text = render_summary(&quit, &Counters::zeroed_severities(), None);
        assert!(!text.contains("reached"));
        assert!(text.contains("Quit count : 1 of 5\n"));
    }
}

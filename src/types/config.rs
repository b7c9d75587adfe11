//! Configuration structures.
//!
//! Configuration is loaded from JSON files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::errors::{Error, Result};

/// Global report server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Report server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a configuration from a JSON document. Missing sections default.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Apply `REPORT_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `REPORT_MAX_QUIT_COUNT`, `REPORT_RECORD_ALL`,
    /// `REPORT_SHOW_VERBOSITY`, `REPORT_SHOW_TERMINATOR`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("REPORT_MAX_QUIT_COUNT") {
            self.server.max_quit_count = raw.trim().parse().map_err(|_| {
                Error::validation(format!("REPORT_MAX_QUIT_COUNT is not a count: {raw}"))
            })?;
        }
        if let Some(raw) = lookup("REPORT_RECORD_ALL") {
            self.server.record_all_messages = parse_flag("REPORT_RECORD_ALL", &raw)?;
        }
        if let Some(raw) = lookup("REPORT_SHOW_VERBOSITY") {
            self.server.show_verbosity = parse_flag("REPORT_SHOW_VERBOSITY", &raw)?;
        }
        if let Some(raw) = lookup("REPORT_SHOW_TERMINATOR") {
            self.server.show_terminator = parse_flag("REPORT_SHOW_TERMINATOR", &raw)?;
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::validation(format!("{key} is not a boolean: {raw}"))),
    }
}

/// Report server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server instance name (recorded on every processed message).
    pub name: String,

    /// Number of COUNT actions tolerated before EXIT. 0 means unlimited.
    pub max_quit_count: u32,

    /// Whether later calls may change `max_quit_count`.
    pub max_quit_overridable: bool,

    /// Include the per-id block in the summary.
    pub enable_id_summary: bool,

    /// Force the RECORD action on every executed message.
    pub record_all_messages: bool,

    /// Render `(verbosity)` after the severity name.
    pub show_verbosity: bool,

    /// Append ` -<SEVERITY>` to every composed message.
    pub show_terminator: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "base".to_string(),
            max_quit_count: 0,
            max_quit_overridable: true,
            enable_id_summary: true,
            record_all_messages: false,
            show_verbosity: false,
            show_terminator: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

//! Shared formatter configuration for structured element dumps.
//!
//! The printer's knobs are shared by every server that holds the same
//! `Arc<Printer>`. Temporary changes go through [`PrefixGuard`], which keeps
//! the knobs locked while rendering and restores them on drop.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::message::MessageElement;

/// Formatting knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterKnobs {
    /// String placed in front of every rendered element line.
    pub prefix: String,
    /// Separator between an element name and its value.
    pub separator: String,
}

impl Default for PrinterKnobs {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            separator: ": ".to_string(),
        }
    }
}

impl PrinterKnobs {
    fn render(&self, elements: &[MessageElement]) -> String {
        elements
            .iter()
            .map(|el| format!("{}{}{}{}", self.prefix, el.name, self.separator, el.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Element printer with shared, mutable knobs.
#[derive(Debug, Default)]
pub struct Printer {
    knobs: Mutex<PrinterKnobs>,
}

impl Printer {
    pub fn new(knobs: PrinterKnobs) -> Self {
        Self {
            knobs: Mutex::new(knobs),
        }
    }

    pub fn knobs(&self) -> PrinterKnobs {
        self.lock().clone()
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.lock().prefix = prefix.into();
    }

    /// Render elements with the current knobs.
    pub fn sprint(&self, elements: &[MessageElement]) -> String {
        self.lock().render(elements)
    }

    /// Swap in `prefix` until the returned guard is dropped.
    pub fn with_prefix(&self, prefix: &str) -> PrefixGuard<'_> {
        let mut knobs = self.lock();
        let saved = std::mem::replace(&mut knobs.prefix, prefix.to_string());
        PrefixGuard { knobs, saved }
    }

    fn lock(&self) -> MutexGuard<'_, PrinterKnobs> {
        self.knobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped prefix override; the previous prefix comes back on drop.
#[derive(Debug)]
pub struct PrefixGuard<'a> {
    knobs: MutexGuard<'a, PrinterKnobs>,
    saved: String,
}

impl PrefixGuard<'_> {
    /// Render elements with the overridden prefix.
    pub fn sprint(&self, elements: &[MessageElement]) -> String {
        self.knobs.render(elements)
    }
}

impl Drop for PrefixGuard<'_> {
    fn drop(&mut self) {
        std::mem::swap(&mut self.knobs.prefix, &mut self.saved);
    }
}

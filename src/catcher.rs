//! Report catchers: ordered filters applied before dispatch.
//!
//! Each catcher may rewrite the message (text, severity, action, ...) and
//! then either throws it on to the next catcher or catches it. The first
//! catch stops the chain and the message is suppressed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::message::{ReportMessage, Severity};
use crate::types::{Error, Result};

/// Verdict of a single catcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchAction {
    /// Pass the (possibly modified) message on.
    Throw,
    /// Suppress the message.
    Caught,
}

/// A filter/transform step.
pub trait ReportCatcher: Send + Sync {
    fn name(&self) -> &str;

    fn catch(&self, message: &mut ReportMessage) -> CatchAction;
}

/// Catcher built from a closure.
pub struct FnCatcher<F> {
    name: String,
    f: F,
}

impl<F> FnCatcher<F>
where
    F: Fn(&mut ReportMessage) -> CatchAction + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ReportCatcher for FnCatcher<F>
where
    F: Fn(&mut ReportMessage) -> CatchAction + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn catch(&self, message: &mut ReportMessage) -> CatchAction {
        (self.f)(message)
    }
}

impl<F> fmt::Debug for FnCatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCatcher").field("name", &self.name).finish()
    }
}

/// Catch and demotion tallies, keyed by the severity the message arrived with.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CatcherStats {
    pub caught: BTreeMap<Severity, u64>,
    pub demoted: BTreeMap<Severity, u64>,
}

impl CatcherStats {
    pub fn caught(&self, severity: Severity) -> u64 {
        self.caught.get(&severity).copied().unwrap_or(0)
    }

    pub fn demoted(&self, severity: Severity) -> u64 {
        self.demoted.get(&severity).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.caught.values().chain(self.demoted.values()).all(|n| *n == 0)
    }
}

/// Ordered catcher pipeline.
#[derive(Default)]
pub struct CatcherChain {
    catchers: RwLock<Vec<Arc<dyn ReportCatcher>>>,
    stats: Mutex<CatcherStats>,
}

impl CatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a catcher; it runs after every catcher already registered.
    pub fn add(&self, catcher: Arc<dyn ReportCatcher>) {
        tracing::debug!(catcher = catcher.name(), "registered report catcher");
        self.catchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(catcher);
    }

    /// Append a closure catcher.
    pub fn add_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ReportMessage) -> CatchAction + Send + Sync + 'static,
    {
        self.add(Arc::new(FnCatcher::new(name, f)));
    }

    /// Remove every catcher registered under `name`.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut catchers = self.catchers.write().unwrap_or_else(PoisonError::into_inner);
        let before = catchers.len();
        catchers.retain(|c| c.name() != name);
        if catchers.len() == before {
            return Err(Error::not_found(format!("report catcher: {name}")));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.catchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the chain. Returns `false` if a catcher suppressed the message.
    pub fn apply(&self, message: &mut ReportMessage) -> bool {
        // Snapshot so catchers may register others without deadlocking.
        let catchers = self
            .catchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if catchers.is_empty() {
            return true;
        }

        let arrived_as = message.severity;
        for catcher in &catchers {
            if catcher.catch(message) == CatchAction::Caught {
                tracing::debug!(
                    catcher = catcher.name(),
                    id = %message.id,
                    "report caught"
                );
                *self.lock_stats().caught.entry(arrived_as).or_default() += 1;
                return false;
            }
        }

        if message.severity < arrived_as {
            *self.lock_stats().demoted.entry(arrived_as).or_default() += 1;
        }
        true
    }

    pub fn stats(&self) -> CatcherStats {
        self.lock_stats().clone()
    }

    pub fn reset_stats(&self) {
        *self.lock_stats() = CatcherStats::default();
    }

    /// Catch/demotion summary text.
    pub fn summarize(&self) -> String {
        let stats = self.stats();
        let mut out = String::from("\n--- Report catcher Summary ---\n\n\n");
        let escalated = [Severity::Fatal, Severity::Error, Severity::Warning];
        for severity in escalated {
            let label = format!("Number of demoted {} reports", severity.name());
            let _ = writeln!(out, "{label:<38}: {:5}", stats.demoted(severity));
        }
        for severity in escalated {
            let label = format!("Number of caught {} reports", severity.name());
            let _ = writeln!(out, "{label:<38}: {:5}", stats.caught(severity));
        }
        out
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, CatcherStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CatcherChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .catchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        f.debug_struct("CatcherChain").field("catchers", &names).finish()
    }
}

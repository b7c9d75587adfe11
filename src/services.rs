//! Composition root shared by report servers.
//!
//! `CoreServices` carries the process-level collaborators a server consults
//! while dispatching: the active server (which composes and executes every
//! processed report), the default recording database and the termination
//! hook. Servers receive it by `Arc`; [`CoreServices::global`] is the
//! process-wide default for callers that do not inject their own.
//!
//! The active server is configuration state. Set it before producers start
//! and leave it alone while reports are in flight.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use crate::recording::MessageDatabase;
use crate::server::ReportExecutor;

/// Orderly termination of the host run.
pub trait TerminationHook: Send + Sync {
    /// EXIT action.
    fn die(&self);

    /// STOP action; `payload` is the fully rendered message.
    fn stop(&self, payload: &str);
}

/// Terminates the process.
#[derive(Debug, Clone, Copy)]
pub struct ExitProcess {
    pub exit_code: i32,
}

impl Default for ExitProcess {
    fn default() -> Self {
        Self { exit_code: 1 }
    }
}

impl TerminationHook for ExitProcess {
    fn die(&self) {
        tracing::error!(exit_code = self.exit_code, "report server requested exit");
        std::process::exit(self.exit_code);
    }

    fn stop(&self, payload: &str) {
        tracing::error!(exit_code = self.exit_code, "report server requested stop");
        eprintln!("{payload}");
        std::process::exit(self.exit_code);
    }
}

/// Termination hook that only records requests. Used by tests and by
/// embedders that drive shutdown themselves.
#[derive(Debug, Default)]
pub struct RecordingTermination {
    dies: AtomicUsize,
    stops: Mutex<Vec<String>>,
}

impl RecordingTermination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn die_count(&self) -> usize {
        self.dies.load(Ordering::SeqCst)
    }

    pub fn stop_payloads(&self) -> Vec<String> {
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TerminationHook for RecordingTermination {
    fn die(&self) {
        self.dies.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self, payload: &str) {
        self.stops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.to_string());
    }
}

/// Shared collaborators of report servers.
pub struct CoreServices {
    active: RwLock<Option<Arc<dyn ReportExecutor>>>,
    default_database: RwLock<Option<Arc<dyn MessageDatabase>>>,
    termination: Arc<dyn TerminationHook>,
}

static GLOBAL: OnceLock<Arc<CoreServices>> = OnceLock::new();

impl CoreServices {
    pub fn new(termination: Arc<dyn TerminationHook>) -> Self {
        Self {
            active: RwLock::new(None),
            default_database: RwLock::new(None),
            termination,
        }
    }

    /// Process-wide default, terminating the process on EXIT/STOP.
    pub fn global() -> Arc<CoreServices> {
        GLOBAL.get_or_init(|| Arc::new(CoreServices::default())).clone()
    }

    /// Make `server` compose and execute every processed report.
    ///
    /// The services keep `server` alive until it is replaced or cleared.
    pub fn set_active_server(&self, server: Arc<dyn ReportExecutor>) {
        tracing::debug!(server = server.name(), "active report server replaced");
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(server);
    }

    pub fn clear_active_server(&self) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn active_server(&self) -> Option<Arc<dyn ReportExecutor>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Database used when a server has none of its own.
    pub fn set_default_database(&self, db: Arc<dyn MessageDatabase>) {
        *self
            .default_database
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(db);
    }

    pub fn default_database(&self) -> Option<Arc<dyn MessageDatabase>> {
        self.default_database
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn termination(&self) -> &Arc<dyn TerminationHook> {
        &self.termination
    }
}

impl Default for CoreServices {
    fn default() -> Self {
        Self::new(Arc::new(ExitProcess::default()))
    }
}

impl fmt::Debug for CoreServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active_server().map(|s| s.name().to_string());
        f.debug_struct("CoreServices")
            .field("active", &active)
            .field("default_database", &self.default_database().is_some())
            .finish()
    }
}

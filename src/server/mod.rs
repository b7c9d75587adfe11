//! Report server - the message-processing pipeline.
//!
//! `ReportServer::process` runs a message through the catcher chain, has the
//! active executor compose it (only when it will be displayed or logged) and
//! then executes its actions:
//!
//! ```text
//!  producer ──► process ──► CatcherChain ──► compose ──► execute
//!                              │ caught                    │
//!                              ▼                           ├─ plan: counters, RECORD-all, COUNT→EXIT
//!                          suppressed                      └─ effects: RECORD, DISPLAY, LOG, EXIT, STOP
//! ```
//!
//! Dispatch is two-phase. The plan phase updates counters and the quit
//! counter under their locks and produces the finalized action set; the
//! effects phase then runs every external call with no lock held.

mod compose;
mod counters;
mod quit;
mod summary;

pub use compose::{compose, ComposeOptions, ELEMENT_PREFIX, NO_REPORT_OBJECT};
pub use counters::Counters;
pub use quit::QuitCounter;
pub use summary::{render_summary, ServerSnapshot};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::catcher::CatcherChain;
use crate::message::{Action, ReportMessage, Severity, Verbosity, MESSAGE_TYPE_NAME};
use crate::printer::Printer;
use crate::recording::{MessageDatabase, StreamCache};
use crate::services::CoreServices;
use crate::sink::{ConsoleSink, FileSink, StdoutConsole};
use crate::time::{TimeSource, WallClock};
use crate::types::ServerConfig;

/// Composes and executes processed reports.
///
/// `ReportServer` is the stock implementation; registering another
/// executor with [`CoreServices::set_active_server`] customizes formatting or
/// action handling for every server sharing those services.
pub trait ReportExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Render the display text of `message`.
    fn compose(&self, message: &ReportMessage) -> String;

    /// Carry out the message's actions and return the finalized action set.
    fn execute(&self, message: &mut ReportMessage, composed: &str) -> Action;
}

/// Outcome of [`ReportServer::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Caught by a catcher or carrying no action; nothing happened.
    Suppressed,
    /// Dispatched with this finalized action set.
    Executed(Action),
}

#[derive(Debug)]
struct ReportCounts {
    severity: Counters<Severity>,
    id: Counters<String>,
}

/// Central report server.
pub struct ReportServer {
    name: String,
    services: Arc<CoreServices>,
    catchers: Arc<CatcherChain>,
    console: Arc<dyn ConsoleSink>,
    printer: Arc<Printer>,
    clock: Arc<dyn TimeSource>,
    counts: Mutex<ReportCounts>,
    quit: Mutex<QuitCounter>,
    streams: StreamCache,
    message_db: RwLock<Option<Arc<dyn MessageDatabase>>>,
    enable_id_summary: AtomicBool,
    record_all_messages: AtomicBool,
    show_verbosity: AtomicBool,
    show_terminator: AtomicBool,
}

impl ReportServer {
    /// Server with an empty catcher chain, stdout console and wall clock.
    pub fn new(name: impl Into<String>, services: Arc<CoreServices>) -> Self {
        Self {
            name: name.into(),
            services,
            catchers: Arc::new(CatcherChain::new()),
            console: Arc::new(StdoutConsole),
            printer: Arc::new(Printer::default()),
            clock: Arc::new(WallClock::new()),
            counts: Mutex::new(ReportCounts {
                severity: Counters::zeroed_severities(),
                id: Counters::new(),
            }),
            quit: Mutex::new(QuitCounter::new()),
            streams: StreamCache::default(),
            message_db: RwLock::new(None),
            enable_id_summary: AtomicBool::new(true),
            record_all_messages: AtomicBool::new(false),
            show_verbosity: AtomicBool::new(false),
            show_terminator: AtomicBool::new(false),
        }
    }

    /// Server configured from `config`.
    pub fn from_config(config: &ServerConfig, services: Arc<CoreServices>) -> Self {
        let server = Self::new(config.name.clone(), services);
        server.set_max_quit_count(i64::from(config.max_quit_count), config.max_quit_overridable);
        server.set_enable_id_summary(config.enable_id_summary);
        server.set_record_all_messages(config.record_all_messages);
        server.set_show_verbosity(config.show_verbosity);
        server.set_show_terminator(config.show_terminator);
        server
    }

    pub fn with_catchers(mut self, catchers: Arc<CatcherChain>) -> Self {
        self.catchers = catchers;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    pub fn with_printer(mut self, printer: Arc<Printer>) -> Self {
        self.printer = printer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catchers(&self) -> &Arc<CatcherChain> {
        &self.catchers
    }

    pub fn services(&self) -> &Arc<CoreServices> {
        &self.services
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Run `message` through the catcher chain and dispatch it.
    pub fn process(&self, message: &mut ReportMessage) -> Disposition {
        message.set_server(&self.name);

        if !self.catchers.apply(message) {
            return Disposition::Suppressed;
        }
        if message.action.is_none() {
            tracing::debug!(id = %message.id, "report carries no action");
            return Disposition::Suppressed;
        }

        let active = self.services.active_server();
        let executor: &dyn ReportExecutor = match &active {
            Some(server) => server.as_ref(),
            None => self,
        };

        let composed = if message.action.intersects(Action::DISPLAY | Action::LOG) {
            executor.compose(message)
        } else {
            String::new()
        };
        Disposition::Executed(executor.execute(message, &composed))
    }

    /// Plan phase of dispatch: update counters and compute the finalized
    /// action set (RECORD forced by `record_all_messages`, EXIT added when a
    /// COUNT reaches the quit limit). Performs no I/O.
    pub fn plan_dispatch(&self, message: &ReportMessage) -> Action {
        {
            let mut counts = self.lock_counts();
            counts.severity.increment(message.severity);
            counts.id.increment(message.id.clone());
        }

        let mut action = message.action;
        if self.record_all_messages() {
            action.insert(Action::RECORD);
        }

        if action.contains(Action::COUNT) {
            let mut quit = self.lock_quit();
            if quit.on_count_action() {
                tracing::info!(
                    quit_count = quit.count(),
                    max_quit_count = quit.max(),
                    "quit count reached"
                );
                action.insert(Action::EXIT);
            }
        }
        action
    }

    /// Render `message`, using `producer` as display name when given.
    pub fn compose_report_message(&self, message: &ReportMessage, producer: Option<&str>) -> String {
        let options = ComposeOptions {
            show_verbosity: self.show_verbosity(),
            show_terminator: self.show_terminator(),
        };
        compose(message, options, self.clock.now(), &self.printer, producer)
    }

    fn record(&self, message: &ReportMessage) {
        let Some(db) = self
            .message_database()
            .or_else(|| self.services.default_database())
        else {
            tracing::debug!(id = %message.id, "no message database, report not recorded");
            return;
        };

        let Some(stream) =
            self.streams
                .get_or_open(&message.producer_name, message.handler_name(), db.as_ref())
        else {
            return;
        };

        if let Some(mut recorder) = stream.open_recorder(&message.name, MESSAGE_TYPE_NAME) {
            message.record(recorder.as_mut());
            recorder.release();
        }
    }

    fn log(&self, message: &ReportMessage, composed: &str) {
        match &message.file_sink {
            FileSink::ConsoleEmitted => {}
            FileSink::Console => self.console.write(composed),
            FileSink::File(file) => {
                if let Err(err) = file.write_line(composed) {
                    tracing::warn!(
                        file = file.label(),
                        error = %err,
                        "failed to write report to log file"
                    );
                }
            }
        }
    }

    /// Emit the catcher summary (when catchers saw activity) and the server
    /// summary as INFO reports. A `FileSink::File` also receives them.
    pub fn report_summarize(&self, file_sink: FileSink) -> Disposition {
        let action = match file_sink {
            FileSink::File(_) => Action::DISPLAY | Action::LOG,
            _ => Action::DISPLAY,
        };

        let stats = self.catchers.stats();
        if !stats.is_empty() {
            let mut catcher_report = ReportMessage::info("UVM/REPORT/CATCHER", self.catchers.summarize())
                .with_verbosity(Verbosity::LOW)
                .with_action(action)
                .with_file_sink(file_sink.clone());
            self.process(&mut catcher_report);
        }

        let mut summary = ReportMessage::info("UVM/REPORT/SERVER", self.summary_text())
            .with_verbosity(Verbosity::LOW)
            .with_action(action)
            .with_file_sink(file_sink);
        self.process(&mut summary)
    }

    // =========================================================================
    // Quit count
    // =========================================================================

    pub fn max_quit_count(&self) -> u64 {
        self.lock_quit().max()
    }

    /// Set the COUNT limit (0 = unlimited). Returns `false` if the limit was
    /// previously locked with `overridable = false`; a `NOMAXQUITOVR` info
    /// report is processed in that case.
    pub fn set_max_quit_count(&self, count: i64, overridable: bool) -> bool {
        let refused_max = {
            let mut quit = self.lock_quit();
            if quit.set_max(count, overridable) {
                return true;
            }
            quit.max()
        };

        let mut notice = ReportMessage::info(
            "NOMAXQUITOVR",
            format!(
                "The max quit count setting of {refused_max} is not overridable to {count} due to a previous setting."
            ),
        )
        .with_verbosity(Verbosity::NONE);
        self.process(&mut notice);
        false
    }

    pub fn quit_count(&self) -> u64 {
        self.lock_quit().count()
    }

    pub fn set_quit_count(&self, count: i64) {
        self.lock_quit().set(count);
    }

    pub fn incr_quit_count(&self) {
        self.lock_quit().increment();
    }

    pub fn reset_quit_count(&self) {
        self.lock_quit().reset();
    }

    /// See [`QuitCounter::is_reached`]: never true while unlimited.
    pub fn is_quit_count_reached(&self) -> bool {
        self.lock_quit().is_reached()
    }

    // =========================================================================
    // Severity and id counts
    // =========================================================================

    pub fn severity_count(&self, severity: Severity) -> u64 {
        self.lock_counts().severity.get(&severity)
    }

    pub fn set_severity_count(&self, severity: Severity, count: i64) {
        self.lock_counts().severity.set(severity, count);
    }

    pub fn incr_severity_count(&self, severity: Severity) {
        self.lock_counts().severity.increment(severity);
    }

    /// Zero every severity. Id counts are left alone.
    pub fn reset_severity_counts(&self) {
        self.lock_counts().severity.reset_severities();
    }

    pub fn severities(&self) -> Vec<Severity> {
        self.lock_counts().severity.keys().copied().collect()
    }

    pub fn id_count(&self, id: &str) -> u64 {
        self.lock_counts().id.get(id)
    }

    pub fn set_id_count(&self, id: impl Into<String>, count: i64) {
        self.lock_counts().id.set(id.into(), count);
    }

    pub fn incr_id_count(&self, id: impl Into<String>) {
        self.lock_counts().id.increment(id.into());
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock_counts().id.keys().cloned().collect()
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Database for recorded messages; overrides the services default.
    /// Streams opened so far are dropped so new ones come from `db`.
    pub fn set_message_database(&self, db: Arc<dyn MessageDatabase>) {
        *self.message_db.write().unwrap_or_else(PoisonError::into_inner) = Some(db);
        self.streams.clear();
    }

    pub fn message_database(&self) -> Option<Arc<dyn MessageDatabase>> {
        self.message_db
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Switches
    // =========================================================================

    pub fn enable_id_summary(&self) -> bool {
        self.enable_id_summary.load(Ordering::Relaxed)
    }

    pub fn set_enable_id_summary(&self, enabled: bool) {
        self.enable_id_summary.store(enabled, Ordering::Relaxed);
    }

    pub fn record_all_messages(&self) -> bool {
        self.record_all_messages.load(Ordering::Relaxed)
    }

    pub fn set_record_all_messages(&self, enabled: bool) {
        self.record_all_messages.store(enabled, Ordering::Relaxed);
    }

    pub fn show_verbosity(&self) -> bool {
        self.show_verbosity.load(Ordering::Relaxed)
    }

    pub fn set_show_verbosity(&self, enabled: bool) {
        self.show_verbosity.store(enabled, Ordering::Relaxed);
    }

    pub fn show_terminator(&self) -> bool {
        self.show_terminator.load(Ordering::Relaxed)
    }

    pub fn set_show_terminator(&self, enabled: bool) {
        self.show_terminator.store(enabled, Ordering::Relaxed);
    }

    // =========================================================================
    // Summary
    // =========================================================================

    /// End-of-run statistics as multi-line text. Reads counters only.
    pub fn summary_text(&self) -> String {
        let quit = self.lock_quit().clone();
        let counts = self.lock_counts();
        let ids = self.enable_id_summary().then_some(&counts.id);
        render_summary(&quit, &counts.severity, ids)
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        let quit = self.lock_quit().clone();
        let counts = self.lock_counts();
        ServerSnapshot {
            name: self.name.clone(),
            quit_count: quit.count(),
            max_quit_count: quit.max(),
            max_quit_overridable: quit.is_overridable(),
            severity_count: counts.severity.clone(),
            id_count: counts.id.clone(),
            enable_id_summary: self.enable_id_summary(),
            record_all_messages: self.record_all_messages(),
            show_verbosity: self.show_verbosity(),
            show_terminator: self.show_terminator(),
        }
    }

    fn lock_counts(&self) -> MutexGuard<'_, ReportCounts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_quit(&self) -> MutexGuard<'_, QuitCounter> {
        self.quit.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportExecutor for ReportServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn compose(&self, message: &ReportMessage) -> String {
        self.compose_report_message(message, None)
    }

    fn execute(&self, message: &mut ReportMessage, composed: &str) -> Action {
        let action = self.plan_dispatch(message);
        message.action = action;

        if action.contains(Action::RECORD) {
            self.record(message);
        }
        if action.contains(Action::DISPLAY) {
            self.console.write(composed);
        }
        if action.contains(Action::LOG) {
            self.log(message, composed);
        }
        if action.contains(Action::EXIT) {
            self.services.termination().die();
        }
        if action.contains(Action::STOP) {
            let payload = format!("$stop from report server, msg: {}", message.sprint());
            self.services.termination().stop(&payload);
        }
        action
    }
}

impl fmt::Debug for ReportServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportServer")
            .field("name", &self.name)
            .field("catchers", &self.catchers)
            .field("quit", &*self.lock_quit())
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

//! Report messages.
//!
//! A `ReportMessage` is created per diagnostic event, handed to
//! `ReportServer::process`, and consumed synchronously. Catchers and the
//! dispatcher may rewrite its text, severity and action in place.

mod action;
mod element;
mod enums;

pub use action::Action;
pub use element::{FieldValue, MessageElement};
pub use enums::{Severity, Verbosity};

use std::fmt::Write as _;

use crate::recording::Recorder;
use crate::sink::FileSink;

/// Type name handed to recorders when a message is recorded.
pub const MESSAGE_TYPE_NAME: &str = "report_message";

/// Identity of the handler that routed a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    /// Short name; half of the recording-stream key.
    pub name: String,
    /// Hierarchical name shown in composed text.
    pub full_name: String,
}

impl HandlerInfo {
    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
        }
    }
}

/// A single diagnostic report.
#[derive(Debug, Clone)]
pub struct ReportMessage {
    pub name: String,
    pub severity: Severity,
    pub id: String,
    pub text: String,
    pub filename: String,
    pub line: u32,
    pub context: String,
    pub verbosity: Verbosity,
    pub action: Action,
    pub producer_name: String,
    pub handler: Option<HandlerInfo>,
    pub file_sink: FileSink,
    pub elements: Vec<MessageElement>,
    server: Option<String>,
}

impl ReportMessage {
    /// New message carrying the default actions for its severity.
    pub fn new(severity: Severity, id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: MESSAGE_TYPE_NAME.to_string(),
            severity,
            id: id.into(),
            text: text.into(),
            filename: String::new(),
            line: 0,
            context: String::new(),
            verbosity: Verbosity::default(),
            action: Action::default_for(severity),
            producer_name: String::new(),
            handler: None,
            file_sink: FileSink::Console,
            elements: Vec::new(),
            server: None,
        }
    }

    pub fn info(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Info, id, text)
    }

    pub fn warning(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, id, text)
    }

    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Error, id, text)
    }

    pub fn fatal(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, id, text)
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_location(mut self, filename: impl Into<String>, line: u32) -> Self {
        self.filename = filename.into();
        self.line = line;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the producer name and the handler that routed the report.
    pub fn with_origin(mut self, producer_name: impl Into<String>, handler: HandlerInfo) -> Self {
        self.producer_name = producer_name.into();
        self.handler = Some(handler);
        self
    }

    pub fn with_file_sink(mut self, sink: FileSink) -> Self {
        self.file_sink = sink;
        self
    }

    pub fn with_element(mut self, element: MessageElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Name of the server that last processed this message.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub(crate) fn set_server(&mut self, name: &str) {
        self.server = Some(name.to_string());
    }

    /// Name of the routing handler, empty when none is attached.
    pub fn handler_name(&self) -> &str {
        self.handler.as_ref().map_or("", |h| h.name.as_str())
    }

    /// Serialise every field into `recorder`.
    pub fn record(&self, recorder: &mut dyn Recorder) {
        recorder.record_field("severity", FieldValue::from(self.severity.name()));
        recorder.record_field("id", FieldValue::from(self.id.as_str()));
        recorder.record_field("message", FieldValue::from(self.text.as_str()));
        recorder.record_field("verbosity", FieldValue::Int(i64::from(self.verbosity.0)));
        recorder.record_field("filename", FieldValue::from(self.filename.as_str()));
        recorder.record_field("line", FieldValue::Int(i64::from(self.line)));
        recorder.record_field("context_name", FieldValue::from(self.context.as_str()));
        recorder.record_field("action", FieldValue::from(self.action.to_string()));
        for element in &self.elements {
            recorder.record_field(&element.name, element.value.clone());
        }
    }

    /// Full field-by-field rendering of the message.
    pub fn sprint(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "name: {}", self.name);
        let _ = writeln!(out, "severity: {}", self.severity);
        let _ = writeln!(out, "id: {}", self.id);
        let _ = writeln!(out, "message: {}", self.text);
        let _ = writeln!(out, "verbosity: {}", self.verbosity);
        let _ = writeln!(out, "filename: {}", self.filename);
        let _ = writeln!(out, "line: {}", self.line);
        let _ = writeln!(out, "context_name: {}", self.context);
        let _ = writeln!(out, "action: {}", self.action);
        let _ = writeln!(out, "producer: {}", self.producer_name);
        let _ = writeln!(out, "handler: {}", self.handler_name());
        for element in &self.elements {
            let _ = writeln!(out, "{}: {}", element.name, element.value);
        }
        out
    }
}

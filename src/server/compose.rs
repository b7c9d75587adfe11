//! Message composition.
//!
//! Layout:
//! `SEV[(verbosity)] [file(line) ]@ <time>: <producer>[@@context] [id] text[\n elements][ -SEV]`

use crate::message::ReportMessage;
use crate::printer::Printer;
use crate::time::Timestamp;

/// Producer name used when neither a name nor a handler is available.
pub const NO_REPORT_OBJECT: &str = "NO_REPORT_OBJECT";

/// Printer prefix used for element dumps inside composed text.
pub const ELEMENT_PREFIX: &str = " +";

/// Display switches read while composing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    pub show_verbosity: bool,
    pub show_terminator: bool,
}

/// Render `message` as display text.
///
/// `producer` overrides the producer display name; `None` or an empty name
/// falls back to the handler's full name, then to [`NO_REPORT_OBJECT`].
pub fn compose(
    message: &ReportMessage,
    options: ComposeOptions,
    now: Timestamp,
    printer: &Printer,
    producer: Option<&str>,
) -> String {
    let severity = message.severity.name();

    let verbosity = if options.show_verbosity {
        format!("({})", message.verbosity)
    } else {
        String::new()
    };

    let location = if message.filename.is_empty() {
        String::new()
    } else {
        format!("{}({}) ", message.filename, message.line)
    };

    let producer = match producer.filter(|p| !p.is_empty()) {
        Some(name) => name,
        None => message
            .handler
            .as_ref()
            .map_or(NO_REPORT_OBJECT, |h| h.full_name.as_str()),
    };

    let context = if message.context.is_empty() {
        String::new()
    } else {
        format!("@@{}", message.context)
    };

    let body = if message.elements.is_empty() {
        message.text.clone()
    } else {
        let guard = printer.with_prefix(ELEMENT_PREFIX);
        format!("{}\n{}", message.text, guard.sprint(&message.elements))
    };

    let terminator = if options.show_terminator {
        format!(" -{severity}")
    } else {
        String::new()
    };

    format!(
        "{severity}{verbosity} {location}@ {now}: {producer}{context} [{id}] {body}{terminator}",
        id = message.id
    )
}

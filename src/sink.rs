//! Output sinks: the console and shared log files.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::Result;

/// Destination of the LOG action.
#[derive(Debug, Clone, Default)]
pub enum FileSink {
    /// Write to the console sink.
    #[default]
    Console,
    /// The console already shows this message; LOG writes nothing.
    ConsoleEmitted,
    /// Append to a shared log file.
    File(LogFile),
}

/// Console output.
#[cfg_attr(test, mockall::automock)]
pub trait ConsoleSink: Send + Sync {
    /// Write one composed message.
    fn write(&self, text: &str);
}

/// Console sink printing to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write(&self, text: &str) {
        println!("{text}");
    }
}

/// Console sink that keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct CapturedConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ConsoleSink for CapturedConsole {
    fn write(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}

/// Shared, cloneable handle to a log destination.
///
/// Clones write to the same underlying writer.
#[derive(Clone)]
pub struct LogFile {
    label: Arc<str>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogFile {
    /// Wrap an arbitrary writer.
    pub fn new(label: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            label: Arc::from(label.into()),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Open `path` for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(path.display().to_string(), file))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append `text` followed by a line terminator.
    pub fn write_line(&self, text: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl fmt::Debug for LogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFile").field("label", &self.label).finish()
    }
}

//! # Report Server - centralized diagnostic message handling
//!
//! Rust implementation of a UVM-style report server providing:
//! - Ordered report catchers that rewrite, demote or suppress messages
//! - Action dispatch (DISPLAY, LOG, COUNT, EXIT, STOP, RECORD)
//! - Quit-count escalation of COUNT actions into EXIT
//! - Per-severity and per-id statistics with an end-of-run summary
//! - Transactional recording of messages into a pluggable database
//!
//! ## Architecture
//!
//! Servers share an injected [`CoreServices`] holding the active executor,
//! the default recording database and the termination hook:
//! ```text
//!                    ┌─────────────────────────────────┐
//!   ReportMessage →  │          ReportServer           │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │ Catcher │ │ Compose │        │
//!                    │  │  Chain  │ │         │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │Counters │ │ Streams │        │
//!                    │  │ & Quit  │ │  Cache  │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    └─────────────────────────────────┘
//!                       │ console │ log file │ database │ termination
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod catcher;
pub mod message;
pub mod printer;
pub mod recording;
pub mod server;
pub mod services;
pub mod sink;
pub mod time;
pub mod types;

// Internal utilities
pub mod observability;

pub use catcher::{CatchAction, CatcherChain, ReportCatcher};
pub use message::{Action, ReportMessage, Severity, Verbosity};
pub use server::{Disposition, ReportExecutor, ReportServer};
pub use services::{CoreServices, TerminationHook};
pub use sink::FileSink;
pub use types::{Config, Error, Result};

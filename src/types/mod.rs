//! Core types for the report server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (StreamId, TransactionId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the server and observability

mod config;
mod errors;
mod ids;

pub use config::{Config, ObservabilityConfig, ServerConfig};
pub use errors::{Error, Result};
pub use ids::{StreamId, TransactionId};

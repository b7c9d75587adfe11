//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The
//! report pipeline itself never fails: these cover the crate's configuration
//! and registration edges.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the report server.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (unknown severity name, bad action mask, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Named entity not found (e.g. removing an unregistered catcher).
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

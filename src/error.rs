// File: src/error.rs
//! Error types for the collocation store.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A point lookup found no entry for the key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value has the wrong shape for its declared type.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// The caller broke the API contract (bad cap, corpus size, measure, distance...).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The 32-bit token identifier counter would wrap.
    #[error("token identifier space exhausted")]
    IdSpaceExhausted,

    /// Failure reported by the underlying key-value engine.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Programmer errors the caller should abort on rather than report.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Precondition(_) | Error::IdSpaceExhausted)
    }
}

//! Error types for accessrules

use thiserror::Error;

/// The main error type for access rule operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Root asset or root group missing. Nothing sensible can continue.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Rejected input: malformed manifest, bad default clause, core override.
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Backing store (LMDB, JSON, filesystem) failed.
    #[error("storage error: {0}")]
    Persistence(String),
}

/// Result type alias for access rule operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Convert any backend error to a persistence failure
pub fn err<E: std::error::Error>(e: E) -> AccessError {
    AccessError::Persistence(e.to_string())
}

impl From<serde_json::Error> for AccessError {
    fn from(e: serde_json::Error) -> Self {
        AccessError::Persistence(format!("malformed rules: {}", e))
    }
}

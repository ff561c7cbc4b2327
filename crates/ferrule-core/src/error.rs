//! Core error types.

use thiserror::Error;

/// Errors raised while constructing or parsing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An extension identifier failed validation.
    #[error("invalid plugin id: {0}")]
    InvalidId(String),

    /// A scope was malformed (e.g. a project scope without an id).
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A capability type string did not name a known capability.
    #[error("unknown capability type: {0}")]
    UnknownCapabilityType(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

//! Capability invocation errors.

use thiserror::Error;

/// Errors raised by a capability implementation during normal use.
///
/// These are deliberately opaque to the registries: they propagate to the
/// caller verbatim, which decides whether to retry, fall back to another
/// capability instance, or surface the failure.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The requested object or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The capability cannot serve requests right now (misconfigured,
    /// disconnected, quota exhausted, ...).
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The implementation does not provide an optional operation.
    #[error("operation '{operation}' not supported by {capability}")]
    Unsupported {
        /// Capability id of the implementation.
        capability: String,
        /// The optional operation that was requested.
        operation: &'static str,
    },

    /// The caller supplied input the capability cannot process.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Credentials or an authentication step were rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The backing service reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapabilityError {
    /// Build an [`Unsupported`](Self::Unsupported) error for an optional
    /// contract operation.
    #[must_use]
    pub fn unsupported(capability: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            capability: capability.into(),
            operation,
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

//! Tokenizer errors.

use thiserror::Error;

use ferrule_capabilities::CapabilityError;

/// Errors raised while building or running a tokenizer.
#[derive(Debug, Error)]
pub enum TokenizeError {
    /// A matcher reported a match that does not advance the cursor.
    #[error("matcher '{matcher}' produced a zero-length match at offset {offset}")]
    ZeroLengthMatch {
        /// Offending matcher id.
        matcher: String,
        /// Cursor position.
        offset: usize,
    },

    /// A matcher reported an end offset past the source or inside a
    /// multi-byte character.
    #[error("matcher '{matcher}' reported invalid end {end} at offset {offset}")]
    InvalidMatch {
        /// Offending matcher id.
        matcher: String,
        /// Cursor position.
        offset: usize,
        /// Reported end offset.
        end: usize,
    },

    /// Shifting a token would move an offset below zero or past `usize::MAX`.
    #[error("shifting offset {offset} by {delta} is out of range")]
    OffsetOutOfRange {
        /// The offset being shifted.
        offset: usize,
        /// The requested shift.
        delta: isize,
    },

    /// A regex matcher pattern failed to compile.
    #[error("invalid pattern for matcher '{matcher}': {source}")]
    InvalidPattern {
        /// Matcher id.
        matcher: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for tokenizer operations.
pub type TokenizeResult<T> = Result<T, TokenizeError>;

impl From<TokenizeError> for CapabilityError {
    fn from(e: TokenizeError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

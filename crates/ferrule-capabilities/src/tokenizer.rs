//! Tokenizer contract and token type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::CapabilityType;

use crate::error::CapabilityResult;

/// One token of a source string.
///
/// `start` and `end` are byte offsets into the tokenized source (always on
/// UTF-8 character boundaries), half-open: `value == source[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token type, e.g. `"variable"`, `"newline"`, `"text"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The exact source text covered by the token.
    pub value: String,
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
    /// Id of the matcher that produced the token; `None` for literal runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    /// Nested tokens (e.g. the parts of a placeholder), in the same
    /// coordinate space as the parent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
}

impl Token {
    /// Create a token without children or matcher attribution.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            start,
            end,
            matcher: None,
            children: Vec::new(),
        }
    }

    /// Length of the token in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the token covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits source text into tokens.
///
/// Several tokenizers may be installed for one scope; callers choose
/// between them by [`priority`](Self::priority) (lower runs first).
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::Tokenizer`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::Tokenizer
    }

    /// Ordering hint among tokenizers, lower first.
    fn priority(&self) -> i32;

    /// Tokenize `source` into a gap-free token stream.
    async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>>;
}

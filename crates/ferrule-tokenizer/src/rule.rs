//! A [`Tokenizer`] capability backed by a [`TokenizerEngine`].

use async_trait::async_trait;
use ferrule_capabilities::{CapabilityResult, Token, Tokenizer};

use crate::engine::TokenizerEngine;

/// Exposes an engine as a `TOKENIZER` capability.
#[derive(Debug, Clone)]
pub struct RuleTokenizer {
    id: String,
    priority: i32,
    engine: TokenizerEngine,
}

impl RuleTokenizer {
    /// Create a tokenizer capability with the given id and priority.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: i32, engine: TokenizerEngine) -> Self {
        Self {
            id: id.into(),
            priority,
            engine,
        }
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &TokenizerEngine {
        &self.engine
    }
}

#[async_trait]
impl Tokenizer for RuleTokenizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>> {
        Ok(self.engine.tokenize(source)?)
    }
}

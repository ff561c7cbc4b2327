//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_tokenizer::prelude::*;` to import the engine and matchers.

pub use crate::{
    LiteralMatcher, MatchedToken, RegexMatcher, RuleTokenizer, Token, TokenMatcher,
    TokenizeError, TokenizeResult, TokenizerEngine, shift_tokens,
};

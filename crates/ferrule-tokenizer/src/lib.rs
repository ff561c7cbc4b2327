//! Tokenizer engine for the Ferrule extension runtime.
//!
//! A [`TokenizerEngine`] walks a source string with a cursor and, at every
//! position, asks its [`TokenMatcher`]s (lowest priority first, ties in
//! registration order) for a token. Positions no matcher claims become
//! literal text, merged into maximal runs. The resulting stream always
//! covers the source exactly:
//!
//! - concatenating every token's `value` reproduces the source
//! - `tokens[i].end == tokens[i + 1].start`
//! - no two literal tokens are adjacent
//!
//! [`RuleTokenizer`] packages an engine as a
//! [`Tokenizer`](ferrule_capabilities::Tokenizer) capability so extensions
//! can contribute it through their `services` hook.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod engine;
mod error;
mod matcher;
mod rule;

pub use engine::{DEFAULT_LITERAL_KIND, TokenizerEngine, shift_tokens};
pub use error::{TokenizeError, TokenizeResult};
pub use matcher::{LiteralMatcher, MatchedToken, RegexMatcher, TokenMatcher};
pub use rule::RuleTokenizer;

pub use ferrule_capabilities::Token;

//! The cursor-driven tokenizer engine.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::Token;
use crate::error::{TokenizeError, TokenizeResult};
use crate::matcher::{MatchedToken, TokenMatcher};

/// Token type given to unmatched text.
pub const DEFAULT_LITERAL_KIND: &str = "text";

/// Composes ordered [`TokenMatcher`]s into a full tokenizer.
#[derive(Clone)]
pub struct TokenizerEngine {
    /// Sorted by priority ascending; equal priorities keep registration order.
    matchers: Vec<Arc<dyn TokenMatcher>>,
    literal_kind: String,
}

impl TokenizerEngine {
    /// Create an engine with no matchers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            literal_kind: DEFAULT_LITERAL_KIND.to_string(),
        }
    }

    /// Use a different token type for literal runs.
    #[must_use]
    pub fn with_literal_kind(mut self, kind: impl Into<String>) -> Self {
        self.literal_kind = kind.into();
        self
    }

    /// Add a matcher (builder form of [`register`](Self::register)).
    #[must_use]
    pub fn with_matcher(mut self, matcher: impl TokenMatcher + 'static) -> Self {
        self.register(Arc::new(matcher));
        self
    }

    /// Add a matcher after every matcher with the same or lower priority.
    pub fn register(&mut self, matcher: Arc<dyn TokenMatcher>) {
        let priority = matcher.priority();
        let at = self
            .matchers
            .partition_point(|existing| existing.priority() <= priority);
        self.matchers.insert(at, matcher);
    }

    /// Matcher ids in the order they are tried.
    #[must_use]
    pub fn matcher_ids(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.id()).collect()
    }

    /// The token type used for literal runs.
    #[must_use]
    pub fn literal_kind(&self) -> &str {
        &self.literal_kind
    }

    /// Tokenize `source`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizeError::ZeroLengthMatch`] or
    /// [`TokenizeError::InvalidMatch`] if a matcher reports a match that
    /// does not advance the cursor to a valid position.
    pub fn tokenize(&self, source: &str) -> TokenizeResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut cursor = 0;

        while let Some(ch) = source.get(cursor..).and_then(|rest| rest.chars().next()) {
            if let Some((matcher, matched)) = self.first_match(source, cursor) {
                let end = Self::checked_end(matcher, source, cursor, matched.end)?;
                tokens.push(Token {
                    kind: matched.kind,
                    value: source[cursor..end].to_string(),
                    start: cursor,
                    end,
                    matcher: Some(matcher.id().to_string()),
                    children: matched.children,
                });
                cursor = end;
                continue;
            }

            let end = cursor.saturating_add(ch.len_utf8());
            match tokens.last_mut() {
                Some(last) if self.is_literal(last) => {
                    last.value.push(ch);
                    last.end = end;
                },
                _ => tokens.push(Token::new(self.literal_kind.clone(), ch, cursor, end)),
            }
            cursor = end;
        }

        trace!(
            source_len = source.len(),
            token_count = tokens.len(),
            "Tokenized source"
        );
        Ok(tokens)
    }

    /// Tokenize a substring that starts at byte `offset` of a larger
    /// document, returning offsets in the document's coordinates.
    ///
    /// # Errors
    ///
    /// Same as [`tokenize`](Self::tokenize), plus
    /// [`TokenizeError::OffsetOutOfRange`] if an offset overflows.
    pub fn parse_nested(&self, substring: &str, offset: usize) -> TokenizeResult<Vec<Token>> {
        let tokens = self.tokenize(substring)?;
        let delta = isize::try_from(offset).map_err(|_| TokenizeError::OffsetOutOfRange {
            offset: 0,
            delta: isize::MAX,
        })?;
        shift_tokens(tokens, delta)
    }

    fn first_match(
        &self,
        source: &str,
        cursor: usize,
    ) -> Option<(&dyn TokenMatcher, MatchedToken)> {
        self.matchers.iter().find_map(|matcher| {
            matcher
                .try_match(source, cursor)
                .map(|matched| (matcher.as_ref(), matched))
        })
    }

    fn checked_end(
        matcher: &dyn TokenMatcher,
        source: &str,
        cursor: usize,
        end: usize,
    ) -> TokenizeResult<usize> {
        if end <= cursor {
            return Err(TokenizeError::ZeroLengthMatch {
                matcher: matcher.id().to_string(),
                offset: cursor,
            });
        }
        if end > source.len() || !source.is_char_boundary(end) {
            return Err(TokenizeError::InvalidMatch {
                matcher: matcher.id().to_string(),
                offset: cursor,
                end,
            });
        }
        Ok(end)
    }

    fn is_literal(&self, token: &Token) -> bool {
        token.matcher.is_none() && token.kind == self.literal_kind
    }
}

impl Default for TokenizerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenizerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenizerEngine")
            .field("matchers", &self.matcher_ids())
            .field("literal_kind", &self.literal_kind)
            .finish()
    }
}

/// Shift every offset in `tokens` (children included) by `delta`.
///
/// # Errors
///
/// Returns [`TokenizeError::OffsetOutOfRange`] if any shifted offset would
/// fall below zero or overflow.
pub fn shift_tokens(mut tokens: Vec<Token>, delta: isize) -> TokenizeResult<Vec<Token>> {
    if delta != 0 {
        shift_in_place(&mut tokens, delta)?;
    }
    Ok(tokens)
}

fn shift_in_place(tokens: &mut [Token], delta: isize) -> TokenizeResult<()> {
    let shift = |offset: usize| {
        offset
            .checked_add_signed(delta)
            .ok_or(TokenizeError::OffsetOutOfRange { offset, delta })
    };
    for token in tokens {
        token.start = shift(token.start)?;
        token.end = shift(token.end)?;
        shift_in_place(&mut token.children, delta)?;
    }
    Ok(())
}

//! Single-token matchers.

use regex::Regex;

use crate::Token;
use crate::error::{TokenizeError, TokenizeResult};

/// A successful match reported by a [`TokenMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedToken {
    /// Token type.
    pub kind: String,
    /// Exclusive end offset in the full source. Must be greater than the
    /// cursor and on a character boundary.
    pub end: usize,
    /// Nested tokens, in full-source coordinates.
    pub children: Vec<Token>,
}

impl MatchedToken {
    /// A match without children.
    #[must_use]
    pub fn new(kind: impl Into<String>, end: usize) -> Self {
        Self {
            kind: kind.into(),
            end,
            children: Vec::new(),
        }
    }
}

/// Recognizes one token at a given cursor position.
pub trait TokenMatcher: Send + Sync {
    /// Identifier recorded on every token this matcher produces.
    fn id(&self) -> &str;

    /// Lower priorities are tried first.
    fn priority(&self) -> i32 {
        0
    }

    /// Try to match at `cursor` (a byte offset on a character boundary).
    fn try_match(&self, source: &str, cursor: usize) -> Option<MatchedToken>;
}

/// Matches a fixed string.
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    id: String,
    kind: String,
    literal: String,
    priority: i32,
}

impl LiteralMatcher {
    /// Match `literal` and emit tokens of type `kind`.
    ///
    /// An empty `literal` never matches.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            literal: literal.into(),
            priority: 0,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl TokenMatcher for LiteralMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn try_match(&self, source: &str, cursor: usize) -> Option<MatchedToken> {
        if self.literal.is_empty() {
            return None;
        }
        let rest = source.get(cursor..)?;
        rest.starts_with(self.literal.as_str())
            .then(|| MatchedToken::new(self.kind.clone(), cursor.saturating_add(self.literal.len())))
    }
}

/// Matches a regular expression anchored at the cursor.
///
/// Named capture groups that participate in a match become child tokens
/// whose type is the group name. An empty match counts as no match.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    id: String,
    kind: String,
    regex: Regex,
    priority: i32,
}

impl RegexMatcher {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizeError::InvalidPattern`] if the pattern does not
    /// compile.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        pattern: &str,
    ) -> TokenizeResult<Self> {
        let id = id.into();
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            TokenizeError::InvalidPattern {
                matcher: id.clone(),
                source,
            }
        })?;
        Ok(Self {
            id,
            kind: kind.into(),
            regex,
            priority: 0,
        })
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl TokenMatcher for RegexMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn try_match(&self, source: &str, cursor: usize) -> Option<MatchedToken> {
        let rest = source.get(cursor..)?;
        let captures = self.regex.captures(rest)?;
        let whole = captures.get(0)?;
        if whole.is_empty() {
            return None;
        }

        let children = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                let group = captures.name(name)?;
                if group.is_empty() {
                    return None;
                }
                let mut child = Token::new(
                    name,
                    group.as_str(),
                    cursor.saturating_add(group.start()),
                    cursor.saturating_add(group.end()),
                );
                child.matcher = Some(self.id.clone());
                Some(child)
            })
            .collect();

        Some(MatchedToken {
            kind: self.kind.clone(),
            end: cursor.saturating_add(whole.end()),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_matcher() {
        let m = LiteralMatcher::new("nl", "newline", "\n");
        assert_eq!(m.try_match("a\nb", 1), Some(MatchedToken::new("newline", 2)));
        assert!(m.try_match("a\nb", 0).is_none());
        assert!(m.try_match("a\nb", 3).is_none());
        assert!(LiteralMatcher::new("e", "e", "").try_match("abc", 0).is_none());
    }

    #[test]
    fn test_regex_matcher_is_anchored_at_cursor() {
        let m = RegexMatcher::new("num", "number", "[0-9]+").unwrap();
        assert!(m.try_match("ab12", 0).is_none());
        assert_eq!(m.try_match("ab12", 2), Some(MatchedToken::new("number", 4)));
    }

    #[test]
    fn test_regex_empty_match_is_no_match() {
        let m = RegexMatcher::new("digits", "number", "[0-9]*").unwrap();
        assert!(m.try_match("abc", 0).is_none());
    }

    #[test]
    fn test_regex_named_groups_become_children() {
        let m = RegexMatcher::new("ph", "placeholder", r"\{(?P<name>[a-z]+)(?::(?P<format>[a-z]+))?\}")
            .unwrap();
        let source = "hi {user}!";
        let matched = m.try_match(source, 3).unwrap();
        assert_eq!(matched.end, 9);
        assert_eq!(matched.children.len(), 1);
        let child = &matched.children[0];
        assert_eq!(child.kind, "name");
        assert_eq!(child.value, "user");
        assert_eq!(&source[child.start..child.end], "user");
        assert_eq!(child.matcher.as_deref(), Some("ph"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RegexMatcher::new("bad", "x", "(").unwrap_err();
        assert!(matches!(err, TokenizeError::InvalidPattern { ref matcher, .. } if matcher == "bad"));
    }
}

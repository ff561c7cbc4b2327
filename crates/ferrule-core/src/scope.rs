//! Installation scopes.
//!
//! A scope names the context an extension installation applies to: the
//! whole deployment, one project, or one user. Scopes are the memoization
//! key for activated extension sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The kind of context an installation is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeType {
    /// Deployment-wide installation. Carries no scope id.
    Global,
    /// Installation bound to a single project.
    Project,
    /// Installation bound to a single user.
    User,
}

impl ScopeType {
    /// Lowercase name used in display strings and config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
            Self::User => "user",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "project" => Ok(Self::Project),
            "user" => Ok(Self::User),
            other => Err(CoreError::InvalidScope(format!("unknown scope type: {other}"))),
        }
    }
}

/// A fully qualified scope: type plus id (absent for [`ScopeType::Global`]).
///
/// The invariant "global scopes carry no id, all other scopes carry a
/// non-empty id" is enforced by every constructor and by deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Scope {
    scope_type: ScopeType,
    scope_id: Option<String>,
}

#[derive(Deserialize)]
struct RawScope {
    scope_type: ScopeType,
    #[serde(default)]
    scope_id: Option<String>,
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawScope::deserialize(deserializer)?;
        Self::new(raw.scope_type, raw.scope_id).map_err(serde::de::Error::custom)
    }
}

impl Scope {
    /// Create a scope, validating the id against the scope type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidScope`] if a global scope is given an id,
    /// or a project/user scope is missing one.
    pub fn new(scope_type: ScopeType, scope_id: Option<String>) -> CoreResult<Self> {
        match (scope_type, &scope_id) {
            (ScopeType::Global, Some(id)) => Err(CoreError::InvalidScope(format!(
                "global scope must not carry an id, got: {id}"
            ))),
            (ScopeType::Project | ScopeType::User, None) => Err(CoreError::InvalidScope(
                format!("{scope_type} scope requires an id"),
            )),
            (ScopeType::Project | ScopeType::User, Some(id)) if id.trim().is_empty() => Err(
                CoreError::InvalidScope(format!("{scope_type} scope id must not be empty")),
            ),
            _ => Ok(Self {
                scope_type,
                scope_id,
            }),
        }
    }

    /// The deployment-wide scope.
    #[must_use]
    pub fn global() -> Self {
        Self {
            scope_type: ScopeType::Global,
            scope_id: None,
        }
    }

    /// A project scope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidScope`] if `id` is empty.
    pub fn project(id: impl Into<String>) -> CoreResult<Self> {
        Self::new(ScopeType::Project, Some(id.into()))
    }

    /// A user scope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidScope`] if `id` is empty.
    pub fn user(id: impl Into<String>) -> CoreResult<Self> {
        Self::new(ScopeType::User, Some(id.into()))
    }

    /// The scope type.
    #[must_use]
    pub fn scope_type(&self) -> ScopeType {
        self.scope_type
    }

    /// The scope id, `None` for the global scope.
    #[must_use]
    pub fn scope_id(&self) -> Option<&str> {
        self.scope_id.as_deref()
    }
}

/// Formats as `global`, `project:<id>` or `user:<id>`.
impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope_id {
            Some(id) => write!(f, "{}:{id}", self.scope_type),
            None => write!(f, "{}", self.scope_type),
        }
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, id)) => Self::new(kind.parse()?, Some(id.to_string())),
            None => Self::new(s.parse()?, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_constructors() {
        assert_eq!(Scope::global().scope_type(), ScopeType::Global);
        assert!(Scope::global().scope_id().is_none());

        let project = Scope::project("42").unwrap();
        assert_eq!(project.scope_type(), ScopeType::Project);
        assert_eq!(project.scope_id(), Some("42"));
    }

    #[test]
    fn test_scope_invariants() {
        assert!(Scope::new(ScopeType::Global, Some("1".into())).is_err());
        assert!(Scope::new(ScopeType::Project, None).is_err());
        assert!(Scope::user("  ").is_err());
    }

    #[test]
    fn test_scope_display_and_parse() {
        let scopes = [
            Scope::global(),
            Scope::project("7").unwrap(),
            Scope::user("alice").unwrap(),
        ];
        for scope in scopes {
            let parsed: Scope = scope.to_string().parse().unwrap();
            assert_eq!(parsed, scope);
        }
        assert_eq!(Scope::project("7").unwrap().to_string(), "project:7");
        assert!("tenant:1".parse::<Scope>().is_err());
        assert!("global:1".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_deserialize_validates() {
        let ok: Scope =
            serde_json::from_str(r#"{"scope_type":"PROJECT","scope_id":"3"}"#).unwrap();
        assert_eq!(ok, Scope::project("3").unwrap());

        let bad = serde_json::from_str::<Scope>(r#"{"scope_type":"USER"}"#);
        assert!(bad.is_err());
    }
}

//! Authentication and second-factor contracts.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::CapabilityType;

use crate::error::{CapabilityError, CapabilityResult};

/// An authentication request forwarded by the host's HTTP layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Query string parameters.
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// Request body (form or JSON), `Null` when absent.
    #[serde(default)]
    pub body: serde_json::Value,
    /// Where the provider should send the user after an external flow.
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// The identity established by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable provider-side subject identifier.
    pub subject: String,
    /// Email address, if the provider disclosed one.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, if the provider disclosed one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Provider-specific claims.
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// What the host should do after an auth step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AuthOutcome {
    /// The user is logged in.
    Authenticated(AuthenticatedUser),
    /// Continue the flow at an external location (OAuth, SAML, ...).
    Redirect {
        /// Target URL.
        location: String,
    },
    /// Credentials were understood but refused.
    Rejected {
        /// Human-readable reason.
        reason: String,
    },
}

/// A login method.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extension-chosen identifier (e.g. `"password"`, `"oidc"`).
    fn id(&self) -> &str;

    /// Always [`CapabilityType::AuthProvider`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::AuthProvider
    }

    /// Whether the method is configured and usable right now.
    async fn is_available(&self) -> bool {
        true
    }

    /// Optional first leg of a multi-step flow (e.g. building an OAuth
    /// authorization URL).
    async fn handle_pre_auth(&self, _request: &AuthRequest) -> CapabilityResult<AuthOutcome> {
        Err(CapabilityError::unsupported(self.id(), "handle_pre_auth"))
    }

    /// Complete authentication.
    async fn handle_auth(&self, request: &AuthRequest) -> CapabilityResult<AuthOutcome>;

    /// Optional provider-side logout for `subject`.
    async fn handle_logout(&self, _subject: &str) -> CapabilityResult<()> {
        Ok(())
    }
}

/// A second-factor method (TOTP, e-mail codes, ...).
#[async_trait]
pub trait MfaProvider: Send + Sync {
    /// Extension-chosen identifier (e.g. `"totp"`).
    fn id(&self) -> &str;

    /// Always [`CapabilityType::MfaProvider`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::MfaProvider
    }

    /// Whether `user` has enrolled this factor.
    async fn is_enabled_for(&self, user: &str) -> CapabilityResult<bool>;

    /// Start enrolment; returns provider-specific setup data (secret, QR
    /// payload, ...).
    async fn initialize(&self, user: &str) -> CapabilityResult<serde_json::Value>;

    /// Check a submitted factor.
    async fn verify(&self, user: &str, payload: &serde_json::Value) -> CapabilityResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PasswordAuth;

    #[async_trait]
    impl AuthProvider for PasswordAuth {
        fn id(&self) -> &str {
            "password"
        }

        async fn handle_auth(&self, request: &AuthRequest) -> CapabilityResult<AuthOutcome> {
            match request.body.get("user").and_then(|v| v.as_str()) {
                Some(user) => Ok(AuthOutcome::Authenticated(AuthenticatedUser {
                    subject: user.to_string(),
                    email: None,
                    display_name: None,
                    attributes: serde_json::Value::Null,
                })),
                None => Ok(AuthOutcome::Rejected {
                    reason: "missing user".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_optional_hooks_have_defaults() {
        let auth = PasswordAuth;
        assert!(auth.is_available().await);
        assert_eq!(auth.capability_type(), CapabilityType::AuthProvider);
        assert!(auth.handle_logout("bob").await.is_ok());

        let err = auth
            .handle_pre_auth(&AuthRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::Unsupported {
                operation: "handle_pre_auth",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_handle_auth_outcomes() {
        let auth = PasswordAuth;
        let request = AuthRequest {
            body: serde_json::json!({"user": "bob"}),
            ..AuthRequest::default()
        };
        let outcome = auth.handle_auth(&request).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated(ref u) if u.subject == "bob"));

        let outcome = auth.handle_auth(&AuthRequest::default()).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Rejected { .. }));
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = serde_json::to_value(AuthOutcome::Redirect {
            location: "https://idp.example/authorize".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "redirect");
    }
}

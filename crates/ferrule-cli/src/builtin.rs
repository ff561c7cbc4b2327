//! Extensions compiled into the `ferrule` binary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use ferrule_capabilities::Service;
use ferrule_core::{CapabilityType, PluginId};
use ferrule_plugins::{
    Extension, ExtensionHooks, ExtensionMetadata, Hook, HookResult, PluginContext, StaticCatalog,
};
use ferrule_tokenizer::{LiteralMatcher, RegexMatcher, RuleTokenizer, TokenizeResult, TokenizerEngine};

/// Id of the built-in tokenizer extension.
pub(crate) const BUILTIN_TOKENIZERS: &str = "builtin-tokenizers";

/// `[extensions.builtin-tokenizers]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct TokenizerSettings {
    /// Pattern recognized as a placeholder variable.
    pub(crate) variable_pattern: String,
    /// Priority of the `simple` tokenizer.
    pub(crate) simple_priority: i32,
    /// Priority of the `fallback` tokenizer.
    pub(crate) fallback_priority: i32,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            variable_pattern: "%[a-zA-Z]".to_owned(),
            simple_priority: 10,
            fallback_priority: 90,
        }
    }
}

impl TokenizerSettings {
    fn defaults_json() -> serde_json::Value {
        let defaults = Self::default();
        serde_json::json!({
            "variable_pattern": defaults.variable_pattern,
            "simple_priority": defaults.simple_priority,
            "fallback_priority": defaults.fallback_priority,
        })
    }

    /// Printf-style engine: variables, newlines and numbers.
    pub(crate) fn simple_engine(&self) -> TokenizeResult<TokenizerEngine> {
        Ok(TokenizerEngine::new()
            .with_matcher(RegexMatcher::new("variable", "variable", &self.variable_pattern)?)
            .with_matcher(LiteralMatcher::new("newline", "newline", "\n"))
            .with_matcher(RegexMatcher::new("number", "number", "[0-9]+")?.with_priority(10)))
    }
}

/// Provides the `simple` and `fallback` tokenizers.
#[derive(Debug)]
pub(crate) struct BuiltinTokenizers {
    id: PluginId,
}

impl BuiltinTokenizers {
    pub(crate) fn new() -> Self {
        Self {
            id: PluginId::from_static(BUILTIN_TOKENIZERS),
        }
    }
}

#[async_trait]
impl Extension for BuiltinTokenizers {
    fn id(&self) -> &PluginId {
        &self.id
    }

    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata::new()
            .with_name("Built-in tokenizers")
            .with_overview("Printf-style placeholder tokenizer and a plain-text fallback")
            .provides(CapabilityType::Tokenizer, "simple")
            .provides(CapabilityType::Tokenizer, "fallback")
    }

    fn hooks(&self) -> ExtensionHooks {
        ExtensionHooks::none().with(Hook::Services)
    }

    async fn services(&self, ctx: &PluginContext) -> HookResult<Vec<Service>> {
        let settings: TokenizerSettings = ctx.config_as()?;
        debug!(
            variable_pattern = %settings.variable_pattern,
            simple_priority = settings.simple_priority,
            "Building built-in tokenizers"
        );

        Ok(vec![
            Service::tokenizer(RuleTokenizer::new(
                "simple",
                settings.simple_priority,
                settings.simple_engine()?,
            )),
            Service::tokenizer(RuleTokenizer::new(
                "fallback",
                settings.fallback_priority,
                TokenizerEngine::new(),
            )),
        ])
    }
}

/// Catalog of every extension this binary can load.
pub(crate) fn catalog() -> StaticCatalog {
    StaticCatalog::new().with_extension(
        PluginId::from_static(BUILTIN_TOKENIZERS),
        TokenizerSettings::defaults_json(),
        || Arc::new(BuiltinTokenizers::new()),
    )
}

//! Tokenizers contributed by an extension, resolved and ranked by the host.

use std::sync::Arc;

use async_trait::async_trait;

use ferrule_capabilities::{Service, Token, TokenizerCapability};
use ferrule_core::{CapabilityType, PluginId, Scope};
use ferrule_events::{Event, EventBus};
use ferrule_plugins::{
    Extension, ExtensionMetadata, HookResult, PluginContext, PluginRegistry, StaticCatalog,
};
use ferrule_storage::MemoryPluginStore;
use ferrule_test::seed_installation;
use ferrule_tokenizer::{LiteralMatcher, RegexMatcher, RuleTokenizer, TokenizerEngine};

fn printf_engine() -> TokenizerEngine {
    TokenizerEngine::new()
        .with_matcher(RegexMatcher::new("variable", "variable", "%[a-z]").unwrap())
        .with_matcher(LiteralMatcher::new("newline", "newline", "\n"))
        .with_matcher(RegexMatcher::new("number", "number", "[0-9]+").unwrap())
}

/// Offered to subscribers before tokens reach the caller.
struct TokensProduced;

impl Event for TokensProduced {
    const NAME: &'static str = "tokens_produced";
    type Payload = Vec<Token>;
}

struct PrintfTokenizers {
    id: PluginId,
}

#[async_trait]
impl Extension for PrintfTokenizers {
    fn id(&self) -> &PluginId {
        &self.id
    }

    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata::new()
            .provides(CapabilityType::Tokenizer, "printf")
            .provides(CapabilityType::Tokenizer, "plain")
    }

    async fn services(&self, _ctx: &PluginContext) -> HookResult<Vec<Service>> {
        Ok(vec![
            Service::tokenizer(RuleTokenizer::new("plain", 90, TokenizerEngine::new())),
            Service::tokenizer(RuleTokenizer::new("printf", 10, printf_engine())),
        ])
    }

    async fn on_activate(&self, ctx: &PluginContext) -> HookResult<()> {
        // Drop trailing newline tokens from every stream.
        ctx.events().subscribe_sync::<TokensProduced, _>(|mut tokens| {
            while tokens.last().is_some_and(|t| t.kind == "newline") {
                tokens.pop();
            }
            Ok(Some(tokens))
        });
        Ok(())
    }
}

async fn activated() -> (PluginRegistry, Arc<EventBus>) {
    let extension = PrintfTokenizers {
        id: PluginId::from_static("printf-tokenizers"),
    };
    let store = Arc::new(MemoryPluginStore::new());
    seed_installation(&store, &Scope::global(), &extension)
        .await
        .unwrap();

    let catalog = StaticCatalog::new().with_extension(
        PluginId::from_static("printf-tokenizers"),
        serde_json::Value::Null,
        || {
            Arc::new(PrintfTokenizers {
                id: PluginId::from_static("printf-tokenizers"),
            })
        },
    );
    let events = Arc::new(EventBus::new());
    let registry = PluginRegistry::new(store, Arc::new(catalog)).with_event_bus(Arc::clone(&events));
    (registry, events)
}

#[tokio::test]
async fn printf_scenario_through_resolved_handle() {
    let (registry, _) = activated().await;
    let handle = registry.get(&Scope::global()).await.unwrap();
    let tokenizer = handle
        .services()
        .await
        .resolve::<TokenizerCapability>(&PluginId::from_static("printf-tokenizers"), "printf")
        .unwrap();

    let tokens = tokenizer.parse("%s\n42").await.unwrap();
    let simple: Vec<_> = tokens
        .iter()
        .map(|t| (t.kind.as_str(), t.start, t.end))
        .collect();
    assert_eq!(
        simple,
        vec![("variable", 0, 2), ("newline", 2, 3), ("number", 3, 5)]
    );
}

#[tokio::test]
async fn host_ranks_tokenizers_by_priority() {
    let (registry, _) = activated().await;
    let handle = registry.get(&Scope::global()).await.unwrap();

    let mut tokenizers = handle.services().await.all::<TokenizerCapability>();
    tokenizers.sort_by_key(|t| t.priority());
    let ids: Vec<&str> = tokenizers.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["printf", "plain"]);

    // The fallback covers everything as a single literal.
    let tokens = tokenizers[1].parse("%s\n42").await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].value, "%s\n42");
}

#[tokio::test]
async fn subscriber_registered_on_activate_refines_tokens() {
    let (registry, events) = activated().await;
    let handle = registry.get(&Scope::global()).await.unwrap();
    let tokenizer = handle
        .services()
        .await
        .resolve::<TokenizerCapability>(&PluginId::from_static("printf-tokenizers"), "printf")
        .unwrap();

    let tokens = tokenizer.parse("42\n\n").await.unwrap();
    assert_eq!(tokens.len(), 3);
    let refined = events.emit::<TokensProduced>(tokens).await.unwrap();
    assert_eq!(refined.len(), 1);
    assert_eq!(refined[0].kind, "number");
}

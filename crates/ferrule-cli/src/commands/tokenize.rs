//! `ferrule tokenize`: run a scope's tokenizer over a string.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use ferrule_capabilities::{Token, Tokenizer, TokenizerCapability};
use ferrule_config::Config;
use ferrule_core::Scope;
use ferrule_plugins::ServiceRegistry;

use super::OutputFormat;
use crate::host;

/// Pick a tokenizer: the one named `id` if given, otherwise the one with
/// the lowest priority value.
pub(crate) fn select_tokenizer(
    services: &ServiceRegistry,
    id: Option<&str>,
) -> Result<Arc<dyn Tokenizer>> {
    let mut tokenizers = services.all::<TokenizerCapability>();
    if let Some(id) = id {
        tokenizers.retain(|t| t.id() == id);
        if tokenizers.len() > 1 {
            bail!("tokenizer id '{id}' is provided by more than one extension");
        }
    }
    tokenizers.sort_by_key(|t| t.priority());
    tokenizers.into_iter().next().with_context(|| match id {
        Some(id) => format!("no tokenizer '{id}' in this scope"),
        None => "no tokenizer installed in this scope".to_owned(),
    })
}

fn print_pretty(tokenizer: &dyn Tokenizer, tokens: &[Token]) {
    println!("{} token(s) from '{}':", tokens.len(), tokenizer.id());
    for token in tokens {
        println!(
            "  {:>4}..{:<4} {:<10} {:?}",
            token.start, token.end, token.kind, token.value
        );
    }
}

/// Tokenize `text` with a tokenizer active in `scope`.
///
/// # Errors
///
/// Fails if the scope cannot be activated, no matching tokenizer exists or
/// the tokenizer rejects the input.
pub(crate) async fn run_tokenize(
    config: &Config,
    scope: &str,
    tokenizer: Option<&str>,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    let scope: Scope = scope.parse()?;
    let registry = host::bootstrap(config).await?;
    let handle = registry
        .get(&scope)
        .await
        .with_context(|| format!("activating scope {scope}"))?;

    let selected = select_tokenizer(&*handle.services().await, tokenizer)?;
    let tokens = selected
        .parse(text)
        .await
        .with_context(|| format!("tokenizer '{}' failed", selected.id()))?;

    match format {
        OutputFormat::Pretty => print_pretty(selected.as_ref(), &tokens),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tokens)?),
    }

    registry.shutdown().await?;
    Ok(())
}

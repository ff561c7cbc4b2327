//! Wiring from the unified config to a running [`PluginRegistry`].

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use ferrule_config::{Config, InstallationConfig};
use ferrule_events::EventBus;
use ferrule_plugins::{PluginRegistry, StaticCatalog};
use ferrule_storage::{ExtensionRecord, MemoryPluginStore};
use ferrule_telemetry::{LogConfig, TelemetryResult};

use crate::builtin::{self, BUILTIN_TOKENIZERS};

/// Convert the `[logging]` section into a telemetry config.
///
/// # Errors
///
/// Returns an error for an unknown format or target name.
pub(crate) fn to_log_config(config: &Config) -> TelemetryResult<LogConfig> {
    LogConfig::from_config(&config.logging)
}

/// Installations to seed. With none configured the built-in tokenizers are
/// installed globally.
fn installations(config: &Config) -> Vec<InstallationConfig> {
    if config.installations.is_empty() {
        vec![InstallationConfig {
            extension: BUILTIN_TOKENIZERS.to_owned(),
            scope: "global".to_owned(),
            metadata: serde_json::Value::Null,
        }]
    } else {
        config.installations.clone()
    }
}

/// Import, install and bind every configured installation.
///
/// # Errors
///
/// Fails for malformed ids or scopes, extensions this binary does not
/// carry, and store conflicts such as a duplicate installation.
pub(crate) async fn seed_store(
    config: &Config,
    catalog: &StaticCatalog,
) -> Result<MemoryPluginStore> {
    let store = MemoryPluginStore::new();

    for entry in installations(config) {
        let plugin_id = entry.plugin_id()?;
        let scope = entry.scope()?;
        let extension = catalog
            .instantiate(&plugin_id)
            .ok_or_else(|| anyhow!("extension '{plugin_id}' is not built into this binary"))?;
        let metadata = extension.metadata();

        if store.get_extension(&plugin_id).await.is_none() {
            let mut record = ExtensionRecord::new(plugin_id.clone());
            if let Some(name) = &metadata.name {
                record = record.with_name(name.clone());
            }
            if let Some(overview) = &metadata.overview {
                record = record.with_overview(overview.clone());
            }
            store.import_extension(record).await?;
        }

        let installation = store
            .install(scope.clone(), plugin_id.clone(), entry.metadata.clone())
            .await
            .with_context(|| format!("installing '{plugin_id}' in scope {scope}"))?;

        for provided in &metadata.provides {
            store
                .bind_service(
                    installation.id,
                    provided.capability_type,
                    provided.capability_id.clone(),
                )
                .await?;
        }

        debug!(
            plugin_id = %plugin_id,
            scope = %scope,
            installation_id = %installation.id,
            bindings = metadata.provides.len(),
            "Seeded installation"
        );
    }

    Ok(store)
}

/// The event bus described by `[events]`.
pub(crate) fn event_bus(config: &Config) -> EventBus {
    match config.events.subscriber_timeout() {
        Some(timeout) => EventBus::new().with_subscriber_timeout(timeout),
        None => EventBus::new(),
    }
}

/// Build a registry backed by a freshly seeded store.
///
/// # Errors
///
/// Propagates [`seed_store`] failures.
pub(crate) async fn bootstrap(config: &Config) -> Result<PluginRegistry> {
    let catalog = builtin::catalog().with_host_config(config.extensions.clone());
    let store = seed_store(config, &catalog).await?;
    let events = Arc::new(event_bus(config));

    info!(
        extensions = catalog.ids().len(),
        installations = store.extensions().await.len(),
        "Host bootstrapped"
    );

    Ok(PluginRegistry::new(Arc::new(store), Arc::new(catalog)).with_event_bus(events))
}

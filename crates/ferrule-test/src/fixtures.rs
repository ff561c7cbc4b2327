//! Store seeding and catalog helpers.

use std::sync::Arc;

use ferrule_core::Scope;
use ferrule_plugins::{Extension, StaticCatalog};
use ferrule_storage::{ExtensionRecord, Installation, MemoryPluginStore, StorageResult};

use crate::mocks::MockExtension;

/// Create a project scope, panicking on a malformed id.
#[must_use]
pub fn test_project(id: &str) -> Scope {
    Scope::project(id).unwrap_or_else(|e| panic!("invalid test project id {id}: {e}"))
}

/// Import (if needed) and install `extension` in `scope`, binding every
/// capability its metadata declares.
///
/// # Errors
///
/// Returns the store's error if the extension is already installed in
/// `scope` or a binding conflicts.
pub async fn seed_installation(
    store: &MemoryPluginStore,
    scope: &Scope,
    extension: &dyn Extension,
) -> StorageResult<Installation> {
    let plugin_id = extension.id().clone();
    let metadata = extension.metadata();
    if store.get_extension(&plugin_id).await.is_none() {
        let mut record = ExtensionRecord::new(plugin_id.clone());
        if let Some(name) = &metadata.name {
            record = record.with_name(name.clone());
        }
        store.import_extension(record).await?;
    }

    let installation = store
        .install(scope.clone(), plugin_id, serde_json::Value::Null)
        .await?;
    for provided in &metadata.provides {
        store
            .bind_service(
                installation.id,
                provided.capability_type,
                provided.capability_id.clone(),
            )
            .await?;
    }
    Ok(installation)
}

/// Seed every mock into `scope`, in order.
///
/// # Errors
///
/// Returns the first seeding error.
pub async fn seed_all(
    store: &MemoryPluginStore,
    scope: &Scope,
    mocks: &[MockExtension],
) -> StorageResult<Vec<Installation>> {
    let mut installations = Vec::with_capacity(mocks.len());
    for mock in mocks {
        installations.push(seed_installation(store, scope, mock).await?);
    }
    Ok(installations)
}

/// A catalog constructing clones of the given mocks.
#[must_use]
pub fn catalog_of(mocks: &[MockExtension]) -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    for mock in mocks {
        let mock = mock.clone();
        catalog.register(mock.plugin_id().clone(), serde_json::json!({}), move || {
            Arc::new(mock.clone())
        });
    }
    catalog
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

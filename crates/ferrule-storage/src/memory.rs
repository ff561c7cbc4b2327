//! In-memory [`PluginStore`] with the administrative workflow.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use ferrule_core::{CapabilityType, InstallationId, PluginId, Scope, ServiceBindingId};

use crate::error::{StorageError, StorageResult};
use crate::records::{ExtensionRecord, Installation, ServiceBinding};
use crate::store::PluginStore;

#[derive(Debug, Default)]
struct Tables {
    extensions: BTreeMap<PluginId, ExtensionRecord>,
    installations: BTreeMap<InstallationId, Installation>,
    bindings: BTreeMap<ServiceBindingId, ServiceBinding>,
    last_installation: u64,
    last_binding: u64,
}

impl Tables {
    fn next_installation_id(&mut self) -> StorageResult<InstallationId> {
        self.last_installation = self
            .last_installation
            .checked_add(1)
            .ok_or_else(|| StorageError::Internal("installation id space exhausted".into()))?;
        Ok(InstallationId(self.last_installation))
    }

    fn next_binding_id(&mut self) -> StorageResult<ServiceBindingId> {
        self.last_binding = self
            .last_binding
            .checked_add(1)
            .ok_or_else(|| StorageError::Internal("binding id space exhausted".into()))?;
        Ok(ServiceBindingId(self.last_binding))
    }

    fn installation_for(&self, scope: &Scope, plugin_id: &PluginId) -> Option<&Installation> {
        self.installations
            .values()
            .find(|i| &i.scope == scope && &i.plugin_id == plugin_id)
    }
}

/// A [`PluginStore`] kept entirely in memory.
///
/// Besides the read interface it enforces the persistence invariants:
/// one installation per (extension, scope), unique capability ids per
/// (installation, capability type), and cascading removal of bindings with
/// their installation.
#[derive(Debug, Default)]
pub struct MemoryPluginStore {
    tables: RwLock<Tables>,
}

impl MemoryPluginStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Extensions
    // ---------------------------------------------------------------------

    /// Import an extension package.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the id is already imported.
    pub async fn import_extension(&self, record: ExtensionRecord) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.extensions.contains_key(&record.id) {
            return Err(StorageError::Conflict(format!(
                "extension {} already imported",
                record.id
            )));
        }
        info!(plugin_id = %record.id, external = record.external, "Imported extension");
        tables.extensions.insert(record.id.clone(), record);
        Ok(())
    }

    /// Remove an imported extension.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown id and
    /// [`StorageError::Conflict`] while any installation still references it.
    pub async fn remove_extension(&self, plugin_id: &PluginId) -> StorageResult<ExtensionRecord> {
        let mut tables = self.tables.write().await;
        let installed = tables
            .installations
            .values()
            .filter(|i| &i.plugin_id == plugin_id)
            .count();
        if installed > 0 {
            return Err(StorageError::Conflict(format!(
                "extension {plugin_id} is still installed in {installed} scope(s)"
            )));
        }
        let record = tables
            .extensions
            .remove(plugin_id)
            .ok_or_else(|| StorageError::NotFound(format!("extension {plugin_id}")))?;
        info!(plugin_id = %plugin_id, "Removed extension");
        Ok(record)
    }

    /// Look up an imported extension.
    pub async fn get_extension(&self, plugin_id: &PluginId) -> Option<ExtensionRecord> {
        self.tables.read().await.extensions.get(plugin_id).cloned()
    }

    /// Every imported extension, ordered by id.
    pub async fn extensions(&self) -> Vec<ExtensionRecord> {
        self.tables.read().await.extensions.values().cloned().collect()
    }

    // ---------------------------------------------------------------------
    // Installations
    // ---------------------------------------------------------------------

    /// Enable an imported extension in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the extension is not imported
    /// and [`StorageError::Conflict`] if it is already installed in `scope`.
    pub async fn install(
        &self,
        scope: Scope,
        plugin_id: PluginId,
        metadata: serde_json::Value,
    ) -> StorageResult<Installation> {
        let mut tables = self.tables.write().await;
        if !tables.extensions.contains_key(&plugin_id) {
            return Err(StorageError::NotFound(format!("extension {plugin_id}")));
        }
        if tables.installation_for(&scope, &plugin_id).is_some() {
            return Err(StorageError::Conflict(format!(
                "extension {plugin_id} already installed in {scope}"
            )));
        }

        let now = Utc::now();
        let installation = Installation {
            id: tables.next_installation_id()?,
            scope,
            metadata,
            plugin_id,
            created_at: now,
            updated_at: now,
        };
        info!(
            installation_id = %installation.id,
            plugin_id = %installation.plugin_id,
            scope = %installation.scope,
            "Installed extension"
        );
        tables
            .installations
            .insert(installation.id, installation.clone());
        Ok(installation)
    }

    /// Replace an installation's scope metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown installation.
    pub async fn update_metadata(
        &self,
        installation_id: InstallationId,
        metadata: serde_json::Value,
    ) -> StorageResult<Installation> {
        let mut tables = self.tables.write().await;
        let installation = tables
            .installations
            .get_mut(&installation_id)
            .ok_or_else(|| StorageError::NotFound(format!("installation {installation_id}")))?;
        installation.metadata = metadata;
        installation.updated_at = Utc::now();
        Ok(installation.clone())
    }

    /// Disable an installation, removing its service bindings with it.
    ///
    /// Returns the removed installation and the number of bindings removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown installation.
    pub async fn uninstall(
        &self,
        installation_id: InstallationId,
    ) -> StorageResult<(Installation, usize)> {
        let mut tables = self.tables.write().await;
        let installation = tables
            .installations
            .remove(&installation_id)
            .ok_or_else(|| StorageError::NotFound(format!("installation {installation_id}")))?;

        let before = tables.bindings.len();
        tables
            .bindings
            .retain(|_, b| b.installation_id != installation_id);
        let removed = before.saturating_sub(tables.bindings.len());

        info!(
            installation_id = %installation_id,
            plugin_id = %installation.plugin_id,
            bindings_removed = removed,
            "Uninstalled extension"
        );
        Ok((installation, removed))
    }

    // ---------------------------------------------------------------------
    // Service bindings
    // ---------------------------------------------------------------------

    /// Record a capability implementation for an installation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for an empty capability id,
    /// [`StorageError::NotFound`] for an unknown installation and
    /// [`StorageError::Conflict`] if the (type, id) pair is already bound.
    pub async fn bind_service(
        &self,
        installation_id: InstallationId,
        capability_type: CapabilityType,
        capability_id: impl Into<String>,
    ) -> StorageResult<ServiceBinding> {
        let capability_id = capability_id.into();
        if capability_id.is_empty() {
            return Err(StorageError::InvalidKey(
                "capability id must not be empty".into(),
            ));
        }

        let mut tables = self.tables.write().await;
        if !tables.installations.contains_key(&installation_id) {
            return Err(StorageError::NotFound(format!(
                "installation {installation_id}"
            )));
        }
        let duplicate = tables.bindings.values().any(|b| {
            b.installation_id == installation_id
                && b.capability_type == capability_type
                && b.capability_id == capability_id
        });
        if duplicate {
            return Err(StorageError::Conflict(format!(
                "{capability_type} '{capability_id}' already bound for installation {installation_id}"
            )));
        }

        let binding = ServiceBinding {
            id: tables.next_binding_id()?,
            installation_id,
            capability_type,
            capability_id,
        };
        debug!(
            binding_id = %binding.id,
            installation_id = %installation_id,
            capability_type = %capability_type,
            capability_id = %binding.capability_id,
            "Bound service"
        );
        tables.bindings.insert(binding.id, binding.clone());
        Ok(binding)
    }

    /// Insert a binding without the uniqueness check.
    ///
    /// Only useful for reproducing a corrupted store, e.g. to exercise the
    /// runtime's duplicate-binding detection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the id space is exhausted.
    pub async fn insert_binding_unchecked(
        &self,
        installation_id: InstallationId,
        capability_type: CapabilityType,
        capability_id: impl Into<String>,
    ) -> StorageResult<ServiceBinding> {
        let mut tables = self.tables.write().await;
        let binding = ServiceBinding {
            id: tables.next_binding_id()?,
            installation_id,
            capability_type,
            capability_id: capability_id.into(),
        };
        tables.bindings.insert(binding.id, binding.clone());
        Ok(binding)
    }

    /// Every binding of an installation, ordered by id.
    pub async fn bindings_for(&self, installation_id: InstallationId) -> Vec<ServiceBinding> {
        self.tables
            .read()
            .await
            .bindings
            .values()
            .filter(|b| b.installation_id == installation_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PluginStore for MemoryPluginStore {
    async fn find_installation(
        &self,
        scope: &Scope,
        plugin_id: &PluginId,
    ) -> StorageResult<Option<Installation>> {
        Ok(self
            .tables
            .read()
            .await
            .installation_for(scope, plugin_id)
            .cloned())
    }

    async fn list_installations(&self, scope: &Scope) -> StorageResult<Vec<Installation>> {
        Ok(self
            .tables
            .read()
            .await
            .installations
            .values()
            .filter(|i| &i.scope == scope)
            .cloned()
            .collect())
    }

    async fn find_service_bindings(
        &self,
        installation_id: InstallationId,
        capability_type: CapabilityType,
        capability_id: &str,
    ) -> StorageResult<Vec<ServiceBinding>> {
        Ok(self
            .tables
            .read()
            .await
            .bindings
            .values()
            .filter(|b| {
                b.installation_id == installation_id
                    && b.capability_type == capability_type
                    && b.capability_id == capability_id
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> PluginId {
        PluginId::new(id).unwrap()
    }

    async fn store_with(ids: &[&str]) -> MemoryPluginStore {
        let store = MemoryPluginStore::new();
        for id in ids {
            store
                .import_extension(ExtensionRecord::new(pid(id)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_import_is_unique() {
        let store = store_with(&["s3-storage"]).await;
        let err = store
            .import_extension(ExtensionRecord::new(pid("s3-storage")))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(store.extensions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_install_requires_imported_extension() {
        let store = MemoryPluginStore::new();
        let err = store
            .install(Scope::global(), pid("ghost"), serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_one_installation_per_scope() {
        let store = store_with(&["s3-storage"]).await;
        store
            .install(Scope::global(), pid("s3-storage"), serde_json::Value::Null)
            .await
            .unwrap();
        let err = store
            .install(Scope::global(), pid("s3-storage"), serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        // A different scope is fine.
        store
            .install(
                Scope::project("7").unwrap(),
                pid("s3-storage"),
                serde_json::Value::Null,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_installations_in_order_and_scoped() {
        let store = store_with(&["b-ext", "a-ext", "c-ext"]).await;
        let project = Scope::project("7").unwrap();
        for id in ["b-ext", "a-ext"] {
            store
                .install(project.clone(), pid(id), serde_json::Value::Null)
                .await
                .unwrap();
        }
        store
            .install(Scope::global(), pid("c-ext"), serde_json::Value::Null)
            .await
            .unwrap();

        let listed: Vec<_> = store
            .list_installations(&project)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.plugin_id.to_string())
            .collect();
        assert_eq!(listed, vec!["b-ext", "a-ext"]);

        let found = store
            .find_installation(&Scope::global(), &pid("c-ext"))
            .await
            .unwrap();
        assert!(found.is_some());
        assert!(
            store
                .find_installation(&project, &pid("c-ext"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_binding_uniqueness_and_lookup() {
        let store = store_with(&["s3-storage"]).await;
        let inst = store
            .install(Scope::global(), pid("s3-storage"), serde_json::Value::Null)
            .await
            .unwrap();

        let binding = store
            .bind_service(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        let err = store
            .bind_service(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        // Same id under another type is a distinct binding.
        store
            .bind_service(inst.id, CapabilityType::TextVectorizer, "s3")
            .await
            .unwrap();

        let found = store
            .find_service_bindings(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        assert_eq!(found, vec![binding]);
        assert!(
            store
                .find_service_bindings(inst.id, CapabilityType::StorageProvider, "gcs")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_bind_service_validation() {
        let store = store_with(&["s3-storage"]).await;
        let err = store
            .bind_service(InstallationId(99), CapabilityType::StorageProvider, "s3")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = store
            .bind_service(InstallationId(1), CapabilityType::StorageProvider, "")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_unchecked_insert_produces_duplicates() {
        let store = store_with(&["s3-storage"]).await;
        let inst = store
            .install(Scope::global(), pid("s3-storage"), serde_json::Value::Null)
            .await
            .unwrap();
        store
            .bind_service(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        store
            .insert_binding_unchecked(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        let found = store
            .find_service_bindings(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_uninstall_cascades_bindings() {
        let store = store_with(&["s3-storage"]).await;
        let inst = store
            .install(Scope::global(), pid("s3-storage"), serde_json::Value::Null)
            .await
            .unwrap();
        store
            .bind_service(inst.id, CapabilityType::StorageProvider, "s3")
            .await
            .unwrap();
        store
            .bind_service(inst.id, CapabilityType::StorageProvider, "s3-eu")
            .await
            .unwrap();

        let err = store.remove_extension(&pid("s3-storage")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let (removed, bindings) = store.uninstall(inst.id).await.unwrap();
        assert_eq!(removed.id, inst.id);
        assert_eq!(bindings, 2);
        assert!(store.bindings_for(inst.id).await.is_empty());

        store.remove_extension(&pid("s3-storage")).await.unwrap();
        assert!(store.get_extension(&pid("s3-storage")).await.is_none());
    }

    #[tokio::test]
    async fn test_update_metadata_touches_timestamp() {
        let store = store_with(&["s3-storage"]).await;
        let inst = store
            .install(Scope::global(), pid("s3-storage"), serde_json::json!({"a": 1}))
            .await
            .unwrap();
        let updated = store
            .update_metadata(inst.id, serde_json::json!({"a": 2}))
            .await
            .unwrap();
        assert_eq!(updated.metadata["a"], 2);
        assert!(updated.updated_at >= inst.updated_at);
        assert_eq!(updated.created_at, inst.created_at);
    }
}

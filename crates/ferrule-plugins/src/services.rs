//! Per-scope registry of live capability instances.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use ferrule_capabilities::{CapabilityKind, Service};
use ferrule_core::{CapabilityType, InstallationId, PluginId, Scope, ServiceBindingId};
use ferrule_storage::PluginStore;

use crate::error::{PluginError, PluginResult};

/// A capability instance resolved against its persisted binding.
#[derive(Debug, Clone)]
pub struct RegisteredService {
    /// Contributing extension.
    pub plugin_id: PluginId,
    /// Installation the service belongs to.
    pub installation_id: InstallationId,
    /// Capability type.
    pub capability_type: CapabilityType,
    /// Extension-chosen capability id.
    pub capability_id: String,
    /// The binding row id, stable across activations.
    pub persistent_id: ServiceBindingId,
    /// The live instance.
    pub service: Service,
}

/// Registered services of one scope, in registration order.
///
/// Rebuilt on every activation and never persisted.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<RegisteredService>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a batch of services from one extension against the store and
    /// append them.
    ///
    /// Every service must match exactly one binding of the extension's
    /// installation in `scope`. The whole batch is resolved before anything
    /// is inserted, so a failure leaves the registry unchanged. Returns the
    /// number of services added.
    ///
    /// # Errors
    ///
    /// - [`PluginError::InstallationNotFound`] if the extension is not
    ///   installed in `scope`
    /// - [`PluginError::Validation`] for an empty id, a duplicate within the
    ///   batch or against already registered services, or an instance whose
    ///   reported capability type disagrees with its variant
    /// - [`PluginError::Consistency`] for zero or multiple matching bindings
    /// - [`PluginError::Storage`] if the store fails
    pub async fn combine(
        &mut self,
        store: &dyn PluginStore,
        scope: &Scope,
        plugin_id: &PluginId,
        services: Vec<Service>,
    ) -> PluginResult<usize> {
        let installation = store
            .find_installation(scope, plugin_id)
            .await?
            .ok_or_else(|| PluginError::InstallationNotFound {
                plugin_id: plugin_id.clone(),
                scope: scope.clone(),
            })?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(services.len());
        for service in services {
            let capability_type = service.capability_type();
            let capability_id = service.id().to_owned();

            if capability_id.is_empty() {
                return Err(PluginError::Validation(format!(
                    "extension {plugin_id} offers a {capability_type} with an empty id"
                )));
            }
            if service.reported_type() != capability_type {
                return Err(PluginError::Validation(format!(
                    "extension {plugin_id} offers '{capability_id}' as {capability_type} but it reports {}",
                    service.reported_type()
                )));
            }
            if !seen.insert((capability_type, capability_id.clone()))
                || self.get(plugin_id, capability_type, &capability_id).is_some()
            {
                return Err(PluginError::Validation(format!(
                    "extension {plugin_id} offers {capability_type} '{capability_id}' more than once"
                )));
            }

            let bindings = store
                .find_service_bindings(installation.id, capability_type, &capability_id)
                .await?;
            let [binding] = bindings.as_slice() else {
                warn!(
                    plugin_id = %plugin_id,
                    capability_type = %capability_type,
                    capability_id = %capability_id,
                    bindings = bindings.len(),
                    "Service binding mismatch"
                );
                return Err(PluginError::Consistency {
                    plugin_id: plugin_id.clone(),
                    capability_type,
                    capability_id,
                    bindings: bindings.len(),
                });
            };

            resolved.push(RegisteredService {
                plugin_id: plugin_id.clone(),
                installation_id: installation.id,
                capability_type,
                capability_id,
                persistent_id: binding.id,
                service,
            });
        }

        let added = resolved.len();
        for entry in &resolved {
            debug!(
                plugin_id = %entry.plugin_id,
                capability_type = %entry.capability_type,
                capability_id = %entry.capability_id,
                persistent_id = %entry.persistent_id,
                "Registered service"
            );
        }
        self.services.extend(resolved);
        Ok(added)
    }

    /// The service registered under the triple.
    #[must_use]
    pub fn get(
        &self,
        plugin_id: &PluginId,
        capability_type: CapabilityType,
        capability_id: &str,
    ) -> Option<&RegisteredService> {
        self.services.iter().find(|s| {
            &s.plugin_id == plugin_id
                && s.capability_type == capability_type
                && s.capability_id == capability_id
        })
    }

    /// The contract object of the service registered under
    /// `(plugin_id, K::TYPE, capability_id)`.
    #[must_use]
    pub fn resolve<K: CapabilityKind>(
        &self,
        plugin_id: &PluginId,
        capability_id: &str,
    ) -> Option<Arc<K::Contract>> {
        self.get(plugin_id, K::TYPE, capability_id)
            .and_then(|s| K::extract(&s.service))
    }

    /// Every service of `capability_type`, in registration order.
    #[must_use]
    pub fn by_type(&self, capability_type: CapabilityType) -> Vec<&RegisteredService> {
        self.services
            .iter()
            .filter(|s| s.capability_type == capability_type)
            .collect()
    }

    /// Every contract object of kind `K`, in registration order.
    #[must_use]
    pub fn all<K: CapabilityKind>(&self) -> Vec<Arc<K::Contract>> {
        self.services
            .iter()
            .filter_map(|s| K::extract(&s.service))
            .collect()
    }

    /// The service bound to the given binding row.
    #[must_use]
    pub fn find_by_persistent_id(&self, id: ServiceBindingId) -> Option<&RegisteredService> {
        self.services.iter().find(|s| s.persistent_id == id)
    }

    /// A copy of every registered service.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RegisteredService> {
        self.services.clone()
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Remove every service.
    pub fn clear(&mut self) {
        self.services.clear();
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ferrule_capabilities::{CapabilityResult, Token, Tokenizer, TokenizerCapability};
    use ferrule_storage::{ExtensionRecord, MemoryPluginStore};

    use super::*;

    struct Fixed {
        id: &'static str,
        reported: CapabilityType,
    }

    impl Fixed {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                reported: CapabilityType::Tokenizer,
            }
        }
    }

    #[async_trait]
    impl Tokenizer for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn capability_type(&self) -> CapabilityType {
            self.reported
        }

        fn priority(&self) -> i32 {
            0
        }

        async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>> {
            Ok(vec![Token::new("text", source, 0, source.len())])
        }
    }

    async fn seeded(ids: &[&str]) -> (MemoryPluginStore, InstallationId) {
        let store = MemoryPluginStore::new();
        let plugin = PluginId::from_static("tok");
        store
            .import_extension(ExtensionRecord::new(plugin.clone()))
            .await
            .unwrap();
        let installation = store
            .install(Scope::global(), plugin, serde_json::Value::Null)
            .await
            .unwrap();
        for id in ids {
            store
                .bind_service(installation.id, CapabilityType::Tokenizer, *id)
                .await
                .unwrap();
        }
        (store, installation.id)
    }

    #[tokio::test]
    async fn test_combine_and_resolve() {
        let (store, installation_id) = seeded(&["simple", "fallback"]).await;
        let plugin = PluginId::from_static("tok");
        let mut registry = ServiceRegistry::new();

        let added = registry
            .combine(
                &store,
                &Scope::global(),
                &plugin,
                vec![
                    Service::tokenizer(Fixed::new("simple")),
                    Service::tokenizer(Fixed::new("fallback")),
                ],
            )
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(registry.len(), 2);

        let entry = registry
            .get(&plugin, CapabilityType::Tokenizer, "fallback")
            .unwrap();
        assert_eq!(entry.installation_id, installation_id);
        assert!(registry.find_by_persistent_id(entry.persistent_id).is_some());

        let tokenizer = registry
            .resolve::<TokenizerCapability>(&plugin, "simple")
            .unwrap();
        assert_eq!(tokenizer.id(), "simple");

        assert!(registry.get(&plugin, CapabilityType::Tokenizer, "other").is_none());
        assert!(registry.get(&plugin, CapabilityType::StorageProvider, "simple").is_none());
        assert!(registry
            .get(&PluginId::from_static("else"), CapabilityType::Tokenizer, "simple")
            .is_none());
        assert_eq!(registry.by_type(CapabilityType::Tokenizer).len(), 2);
        assert_eq!(registry.all::<TokenizerCapability>().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_binding_is_consistency_error() {
        let (store, _) = seeded(&["simple"]).await;
        let mut registry = ServiceRegistry::new();
        let err = registry
            .combine(
                &store,
                &Scope::global(),
                &PluginId::from_static("tok"),
                vec![
                    Service::tokenizer(Fixed::new("simple")),
                    Service::tokenizer(Fixed::new("unbound")),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Consistency { bindings: 0, .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_binding_is_consistency_error() {
        let (store, installation_id) = seeded(&["simple"]).await;
        store
            .insert_binding_unchecked(installation_id, CapabilityType::Tokenizer, "simple")
            .await
            .unwrap();
        let mut registry = ServiceRegistry::new();
        let err = registry
            .combine(
                &store,
                &Scope::global(),
                &PluginId::from_static("tok"),
                vec![Service::tokenizer(Fixed::new("simple"))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Consistency { bindings: 2, .. }));
    }

    #[tokio::test]
    async fn test_batch_validation() {
        let (store, _) = seeded(&["simple"]).await;
        let plugin = PluginId::from_static("tok");
        let mut registry = ServiceRegistry::new();

        let err = registry
            .combine(
                &store,
                &Scope::global(),
                &plugin,
                vec![
                    Service::tokenizer(Fixed::new("simple")),
                    Service::tokenizer(Fixed::new("simple")),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Validation(_)));

        let err = registry
            .combine(&store, &Scope::global(), &plugin, vec![Service::tokenizer(Fixed::new(""))])
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Validation(ref m) if m.contains("empty id")));

        let liar = Fixed {
            id: "simple",
            reported: CapabilityType::StorageProvider,
        };
        let err = registry
            .combine(&store, &Scope::global(), &plugin, vec![Service::tokenizer(liar)])
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Validation(ref m) if m.contains("reports")));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_installation() {
        let (store, _) = seeded(&[]).await;
        let mut registry = ServiceRegistry::new();
        let err = registry
            .combine(
                &store,
                &Scope::project("7").unwrap(),
                &PluginId::from_static("tok"),
                Vec::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InstallationNotFound { .. }));
    }
}

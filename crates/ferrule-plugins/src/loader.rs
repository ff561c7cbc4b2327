//! Supplying extension instances to the runtime.
//!
//! The runtime never constructs extensions itself. It asks an
//! [`ExtensionLoader`] for each installed extension id. [`StaticCatalog`]
//! is the loader for extensions compiled into the host: a table of
//! constructors keyed by id, each with its default configuration.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use ferrule_core::PluginId;

use crate::error::{PluginError, PluginResult};
use crate::extension::Extension;

/// An extension instance ready for activation.
#[derive(Clone)]
pub struct LoadedExtension {
    /// The instance.
    pub extension: Arc<dyn Extension>,
    /// Effective configuration passed to its hooks.
    pub config: serde_json::Value,
}

impl fmt::Debug for LoadedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedExtension")
            .field("id", self.extension.id())
            .field("config", &self.config)
            .finish()
    }
}

/// Produces extension instances by id.
#[async_trait]
pub trait ExtensionLoader: Send + Sync {
    /// Load the extension with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::LoadFailed`] if the extension is unknown or
    /// cannot be constructed.
    async fn load(&self, plugin_id: &PluginId) -> PluginResult<LoadedExtension>;
}

type Factory = Arc<dyn Fn() -> Arc<dyn Extension> + Send + Sync>;

struct CatalogEntry {
    factory: Factory,
    defaults: serde_json::Value,
}

/// Compile-time registry of extension constructors.
#[derive(Default)]
pub struct StaticCatalog {
    entries: HashMap<PluginId, CatalogEntry>,
    host_config: BTreeMap<String, serde_json::Value>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constructor with its default configuration.
    #[must_use]
    pub fn with_extension<F>(mut self, plugin_id: PluginId, defaults: serde_json::Value, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Extension> + Send + Sync + 'static,
    {
        self.register(plugin_id, defaults, factory);
        self
    }

    /// Add a constructor with its default configuration, replacing any
    /// previous entry for the id.
    pub fn register<F>(&mut self, plugin_id: PluginId, defaults: serde_json::Value, factory: F)
    where
        F: Fn() -> Arc<dyn Extension> + Send + Sync + 'static,
    {
        debug!(plugin_id = %plugin_id, "Catalogued extension");
        self.entries.insert(
            plugin_id,
            CatalogEntry {
                factory: Arc::new(factory),
                defaults,
            },
        );
    }

    /// Overlay host configuration, keyed by extension id, on the defaults.
    #[must_use]
    pub fn with_host_config(mut self, host_config: BTreeMap<String, serde_json::Value>) -> Self {
        self.host_config = host_config;
        self
    }

    /// Catalogued ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<PluginId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether `plugin_id` is catalogued.
    #[must_use]
    pub fn contains(&self, plugin_id: &PluginId) -> bool {
        self.entries.contains_key(plugin_id)
    }

    /// Construct an instance outside of activation, e.g. to read its
    /// metadata.
    #[must_use]
    pub fn instantiate(&self, plugin_id: &PluginId) -> Option<Arc<dyn Extension>> {
        self.entries.get(plugin_id).map(|e| (e.factory)())
    }
}

impl fmt::Debug for StaticCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCatalog")
            .field("extensions", &self.ids())
            .field("configured", &self.host_config.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl ExtensionLoader for StaticCatalog {
    async fn load(&self, plugin_id: &PluginId) -> PluginResult<LoadedExtension> {
        let entry = self
            .entries
            .get(plugin_id)
            .ok_or_else(|| PluginError::LoadFailed {
                plugin_id: plugin_id.clone(),
                message: "no such extension in the catalog".into(),
            })?;

        let extension = (entry.factory)();
        if extension.id() != plugin_id {
            return Err(PluginError::LoadFailed {
                plugin_id: plugin_id.clone(),
                message: format!("constructor produced extension {}", extension.id()),
            });
        }

        let mut config = entry.defaults.clone();
        if let Some(overlay) = self.host_config.get(plugin_id.as_str()) {
            merge_json(&mut config, overlay);
        }

        Ok(LoadedExtension { extension, config })
    }
}

/// Recursively merge `overlay` into `base`. Objects merge per key; any
/// other value replaces.
pub fn merge_json(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}

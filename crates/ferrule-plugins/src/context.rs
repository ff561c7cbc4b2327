//! Contexts handed to extension hooks.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::Span;

use ferrule_capabilities::CapabilityKind;
use ferrule_core::{PluginId, Scope};
use ferrule_events::EventBus;
use ferrule_storage::Installation;

use crate::error::{PluginError, PluginResult};
use crate::services::RegisteredService;

/// Everything an extension hook may consult while its scope activates.
#[derive(Debug, Clone)]
pub struct PluginContext {
    installation: Installation,
    config: serde_json::Value,
    services: Vec<RegisteredService>,
    events: Arc<EventBus>,
    span: Span,
}

impl PluginContext {
    /// Build a context for the extension behind `installation`.
    ///
    /// `services` is the scope's registered services at the time the hook
    /// runs; extensions activated earlier are visible, later ones are not.
    #[must_use]
    pub fn new(
        installation: Installation,
        config: serde_json::Value,
        services: Vec<RegisteredService>,
        events: Arc<EventBus>,
    ) -> Self {
        let span = tracing::info_span!(
            "extension",
            plugin_id = %installation.plugin_id,
            scope = %installation.scope,
        );
        Self {
            installation,
            config,
            services,
            events,
            span,
        }
    }

    /// The extension's id.
    #[must_use]
    pub fn plugin_id(&self) -> &PluginId {
        &self.installation.plugin_id
    }

    /// The scope being activated.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.installation.scope
    }

    /// The installation row.
    #[must_use]
    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    /// Free-form scope metadata stored on the installation.
    #[must_use]
    pub fn metadata(&self) -> &serde_json::Value {
        &self.installation.metadata
    }

    /// The extension's configuration: loader defaults overlaid with host
    /// configuration.
    #[must_use]
    pub fn config(&self) -> &serde_json::Value {
        &self.config
    }

    /// Deserialize the configuration into a typed struct.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] if the value does not match `T`.
    pub fn config_as<T: DeserializeOwned>(&self) -> PluginResult<T> {
        serde_json::from_value(self.config.clone()).map_err(|e| {
            PluginError::Validation(format!(
                "invalid configuration for extension {}: {e}",
                self.plugin_id()
            ))
        })
    }

    /// Services registered before this hook ran.
    #[must_use]
    pub fn services(&self) -> &[RegisteredService] {
        &self.services
    }

    /// Look up an earlier registered service by kind.
    #[must_use]
    pub fn resolve<K: CapabilityKind>(
        &self,
        plugin_id: &PluginId,
        capability_id: &str,
    ) -> Option<Arc<K::Contract>> {
        self.services
            .iter()
            .find(|s| {
                &s.plugin_id == plugin_id
                    && s.capability_type == K::TYPE
                    && s.capability_id == capability_id
            })
            .and_then(|s| K::extract(&s.service))
    }

    /// The host's event bus.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The tracing span hooks run inside.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// A route an extension mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMount {
    /// Mounting extension.
    pub plugin_id: PluginId,
    /// Absolute path, always under the extension's base path.
    pub path: String,
    /// Handler name; interpretation is left to the serving layer.
    pub handler: String,
}

/// Collects the routes one extension mounts during activation.
#[derive(Debug, Clone)]
pub struct RouteContext {
    plugin_id: PluginId,
    base_path: String,
    mounts: Vec<RouteMount>,
}

impl RouteContext {
    /// A context rooted at `/plugins/{plugin_id}`.
    #[must_use]
    pub fn new(plugin_id: PluginId) -> Self {
        let base_path = format!("/plugins/{plugin_id}");
        Self {
            plugin_id,
            base_path,
            mounts: Vec::new(),
        }
    }

    /// The base path all routes are mounted under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Mount `handler` at `path` relative to the base path. Returns the
    /// absolute path.
    pub fn mount(&mut self, path: &str, handler: impl Into<String>) -> String {
        let relative = path.trim_start_matches('/');
        let full = if relative.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}/{relative}", self.base_path)
        };
        self.mounts.push(RouteMount {
            plugin_id: self.plugin_id.clone(),
            path: full.clone(),
            handler: handler.into(),
        });
        full
    }

    /// Routes mounted so far.
    #[must_use]
    pub fn mounts(&self) -> &[RouteMount] {
        &self.mounts
    }

    /// Consume the context, returning its routes.
    #[must_use]
    pub fn into_mounts(self) -> Vec<RouteMount> {
        self.mounts
    }
}

//! The extension trait and its declarative metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_capabilities::Service;
use ferrule_core::{CapabilityType, PluginId};

use crate::components::Component;
use crate::context::{PluginContext, RouteContext};
use crate::error::{Hook, HookResult};

/// A capability an extension declares it provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvidedCapability {
    /// Capability type.
    pub capability_type: CapabilityType,
    /// Capability id the implementation will report.
    pub capability_id: String,
}

/// Static description of an extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Short description.
    #[serde(default)]
    pub overview: Option<String>,
    /// Declared capabilities, used to create service bindings on install.
    #[serde(default)]
    pub provides: Vec<ProvidedCapability>,
    /// Extensions that must activate before this one in the same scope.
    #[serde(default)]
    pub depends_on: Vec<PluginId>,
}

impl ExtensionMetadata {
    /// Empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the overview text.
    #[must_use]
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    /// Declare a provided capability.
    #[must_use]
    pub fn provides(mut self, capability_type: CapabilityType, capability_id: impl Into<String>) -> Self {
        self.provides.push(ProvidedCapability {
            capability_type,
            capability_id: capability_id.into(),
        });
        self
    }

    /// Declare a dependency.
    #[must_use]
    pub fn depends_on(mut self, plugin_id: PluginId) -> Self {
        self.depends_on.push(plugin_id);
        self
    }
}

/// Which lifecycle hooks the runtime calls on an extension.
///
/// Captured once when the extension is loaded; a disabled hook is never
/// invoked, whatever the trait method does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtensionHooks {
    /// Call [`Extension::services`].
    pub services: bool,
    /// Call [`Extension::components`].
    pub components: bool,
    /// Call [`Extension::routes`].
    pub routes: bool,
    /// Call [`Extension::on_activate`].
    pub on_activate: bool,
    /// Call [`Extension::on_deactivate`].
    pub on_deactivate: bool,
}

impl ExtensionHooks {
    /// Every hook enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            services: true,
            components: true,
            routes: true,
            on_activate: true,
            on_deactivate: true,
        }
    }

    /// Every hook disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            services: false,
            components: false,
            routes: false,
            on_activate: false,
            on_deactivate: false,
        }
    }

    /// Enable one hook.
    #[must_use]
    pub const fn with(mut self, hook: Hook) -> Self {
        match hook {
            Hook::Services => self.services = true,
            Hook::Components => self.components = true,
            Hook::Routes => self.routes = true,
            Hook::Activate => self.on_activate = true,
            Hook::Deactivate => self.on_deactivate = true,
        }
        self
    }

    /// Whether `hook` is enabled.
    #[must_use]
    pub const fn enabled(self, hook: Hook) -> bool {
        match hook {
            Hook::Services => self.services,
            Hook::Components => self.components,
            Hook::Routes => self.routes,
            Hook::Activate => self.on_activate,
            Hook::Deactivate => self.on_deactivate,
        }
    }
}

/// An extension contributing capabilities to a scope.
///
/// During activation the runtime calls, in order and only when enabled in
/// [`hooks`](Self::hooks): `services`, `components`, `routes`,
/// `on_activate`. On deactivation it calls `on_deactivate`. Every hook
/// receives a [`PluginContext`] for the scope being activated.
#[async_trait]
pub trait Extension: Send + Sync {
    /// The extension's id.
    fn id(&self) -> &PluginId;

    /// Declared capabilities and dependencies.
    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata::default()
    }

    /// Which hooks the runtime should call. Defaults to all of them.
    fn hooks(&self) -> ExtensionHooks {
        ExtensionHooks::all()
    }

    /// Capability instances to register for the scope.
    async fn services(&self, _ctx: &PluginContext) -> HookResult<Vec<Service>> {
        Ok(Vec::new())
    }

    /// UI components to register for the scope.
    async fn components(&self, _ctx: &PluginContext) -> HookResult<Vec<Component>> {
        Ok(Vec::new())
    }

    /// Mount routes under the extension's base path.
    async fn routes(&self, _ctx: &PluginContext, _routes: &mut RouteContext) -> HookResult<()> {
        Ok(())
    }

    /// Called once the extension's services and components are registered.
    async fn on_activate(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }

    /// Called when the scope is deactivated, in reverse activation order.
    async fn on_deactivate(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("id", self.id())
            .field("hooks", &self.hooks())
            .finish_non_exhaustive()
    }
}

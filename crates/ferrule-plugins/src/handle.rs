//! One scope's activated extensions and registries.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, RwLockReadGuard};
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use ferrule_core::{PluginId, Scope};
use ferrule_events::EventBus;
use ferrule_storage::{Installation, PluginStore};

use crate::components::ComponentRegistry;
use crate::context::{PluginContext, RouteContext, RouteMount};
use crate::error::{Hook, PluginError, PluginResult};
use crate::events::ScopeLifecycle;
use crate::extension::{Extension, ExtensionHooks};
use crate::loader::{ExtensionLoader, LoadedExtension};
use crate::services::ServiceRegistry;

/// Lifecycle state of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeState {
    /// Nothing loaded.
    Unloaded,
    /// Extensions loaded and ordered, hooks not yet run.
    Discovered,
    /// Hooks running.
    Activating,
    /// Every extension activated.
    Active,
    /// `on_deactivate` hooks running.
    Deactivating,
    /// The last activation aborted; registries were cleared.
    Failed(String),
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => f.write_str("unloaded"),
            Self::Discovered => f.write_str("discovered"),
            Self::Activating => f.write_str("activating"),
            Self::Active => f.write_str("active"),
            Self::Deactivating => f.write_str("deactivating"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Clone)]
struct ActiveExtension {
    installation: Installation,
    extension: Arc<dyn Extension>,
    config: serde_json::Value,
    hooks: ExtensionHooks,
    depends_on: Vec<PluginId>,
}

impl ActiveExtension {
    fn plugin_id(&self) -> &PluginId {
        &self.installation.plugin_id
    }
}

#[derive(Default)]
struct Lifecycle {
    extensions: Vec<ActiveExtension>,
    activation_id: Option<Uuid>,
}

/// Stable topological order: repeatedly take the first remaining item
/// whose dependencies are all placed.
pub(crate) fn order_by_dependencies<T>(
    items: Vec<T>,
    id_of: impl Fn(&T) -> &PluginId,
    deps_of: impl Fn(&T) -> &[PluginId],
) -> PluginResult<Vec<T>> {
    let present: HashSet<&PluginId> = items.iter().map(&id_of).collect();
    for item in &items {
        if let Some(missing) = deps_of(item).iter().find(|d| !present.contains(d)) {
            return Err(PluginError::DependencyMissing {
                plugin_id: id_of(item).clone(),
                dependency: missing.clone(),
            });
        }
    }

    let mut pending = items;
    let mut placed: HashSet<PluginId> = HashSet::new();
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let Some(pos) = pending
            .iter()
            .position(|item| deps_of(item).iter().all(|d| placed.contains(d)))
        else {
            return Err(PluginError::DependencyCycle {
                plugins: pending.iter().map(|item| id_of(item).clone()).collect(),
            });
        };
        let next = pending.remove(pos);
        placed.insert(id_of(&next).clone());
        ordered.push(next);
    }
    Ok(ordered)
}

/// Result of a completed deactivation.
#[derive(Debug)]
pub(crate) struct Deactivation {
    /// Payload for `ScopeDeactivated`; `None` if no activation was recorded.
    pub(crate) lifecycle: Option<ScopeLifecycle>,
    /// First `on_deactivate` failure.
    pub(crate) first_error: Option<PluginError>,
}

/// The activated state of one scope.
///
/// Obtained from [`PluginRegistry::get`](crate::PluginRegistry::get), which
/// only hands out fully activated handles.
pub struct ScopeHandle {
    scope: Scope,
    store: Arc<dyn PluginStore>,
    loader: Arc<dyn ExtensionLoader>,
    events: Arc<EventBus>,
    state: RwLock<ScopeState>,
    lifecycle: Mutex<Lifecycle>,
    services: tokio::sync::RwLock<ServiceRegistry>,
    components: tokio::sync::RwLock<ComponentRegistry>,
    routes: tokio::sync::RwLock<Vec<RouteMount>>,
}

impl ScopeHandle {
    pub(crate) fn new(
        scope: Scope,
        store: Arc<dyn PluginStore>,
        loader: Arc<dyn ExtensionLoader>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            scope,
            store,
            loader,
            events,
            state: RwLock::new(ScopeState::Unloaded),
            lifecycle: Mutex::new(Lifecycle::default()),
            services: tokio::sync::RwLock::new(ServiceRegistry::new()),
            components: tokio::sync::RwLock::new(ComponentRegistry::new()),
            routes: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    /// The scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScopeState {
        self.state
            .read()
            .unwrap_or_else(|e| {
                warn!("ScopeHandle state lock poisoned, recovering");
                e.into_inner()
            })
            .clone()
    }

    fn set_state(&self, next: ScopeState) {
        let mut state = self.state.write().unwrap_or_else(|e| {
            warn!("ScopeHandle state lock poisoned, recovering");
            e.into_inner()
        });
        debug!(scope = %self.scope, from = %*state, to = %next, "Scope state change");
        *state = next;
    }

    /// Read access to the scope's services.
    pub async fn services(&self) -> RwLockReadGuard<'_, ServiceRegistry> {
        self.services.read().await
    }

    /// Read access to the scope's components.
    pub async fn components(&self) -> RwLockReadGuard<'_, ComponentRegistry> {
        self.components.read().await
    }

    /// Routes mounted by the scope's extensions, in activation order.
    pub async fn routes(&self) -> Vec<RouteMount> {
        self.routes.read().await.clone()
    }

    /// Id of the current activation, if active.
    pub async fn activation_id(&self) -> Option<Uuid> {
        self.lifecycle.lock().await.activation_id
    }

    /// Activated extensions in activation order.
    pub async fn plugins(&self) -> Vec<PluginId> {
        self.lifecycle
            .lock()
            .await
            .extensions
            .iter()
            .map(|e| e.plugin_id().clone())
            .collect()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Load, order and activate every extension installed in the scope.
    ///
    /// Either every hook succeeds and the lifecycle payload to announce is
    /// returned, or the registries and route table are cleared, the state
    /// becomes [`ScopeState::Failed`] and the first error is returned.
    pub(crate) async fn activate(&self) -> PluginResult<ScopeLifecycle> {
        let mut lifecycle = self.lifecycle.lock().await;
        let state = self.state();
        if !matches!(state, ScopeState::Unloaded | ScopeState::Failed(_)) {
            return Err(PluginError::ScopeFailed {
                scope: self.scope.clone(),
                reason: format!("cannot activate from state {state}"),
            });
        }

        if let Err(e) = self.run_activation(&mut lifecycle).await {
            lifecycle.extensions.clear();
            self.clear_registries().await;
            error!(scope = %self.scope, error = %e, "Scope activation failed");
            self.set_state(ScopeState::Failed(e.to_string()));
            return Err(e);
        }

        let activation_id = Uuid::new_v4();
        lifecycle.activation_id = Some(activation_id);
        let payload = ScopeLifecycle {
            scope: self.scope.clone(),
            activation_id,
            plugins: lifecycle.extensions.iter().map(|e| e.plugin_id().clone()).collect(),
        };
        self.set_state(ScopeState::Active);
        drop(lifecycle);

        let services = self.services.read().await.len();
        let components = self.components.read().await.len();
        info!(
            scope = %self.scope,
            activation_id = %activation_id,
            extensions = payload.plugins.len(),
            services,
            components,
            "Scope activated"
        );
        Ok(payload)
    }

    async fn run_activation(&self, lifecycle: &mut Lifecycle) -> PluginResult<()> {
        let installations = self.store.list_installations(&self.scope).await?;
        let mut loaded = Vec::with_capacity(installations.len());
        for installation in installations {
            let LoadedExtension { extension, config } =
                self.loader.load(&installation.plugin_id).await?;
            debug!(plugin_id = %installation.plugin_id, scope = %self.scope, "Loaded extension");
            loaded.push(ActiveExtension {
                hooks: extension.hooks(),
                depends_on: extension.metadata().depends_on,
                installation,
                extension,
                config,
            });
        }

        let ordered = order_by_dependencies(loaded, ActiveExtension::plugin_id, |e| {
            e.depends_on.as_slice()
        })?;
        self.set_state(ScopeState::Discovered);
        self.set_state(ScopeState::Activating);

        for extension in ordered {
            self.activate_extension(&extension).await?;
            lifecycle.extensions.push(extension);
        }
        Ok(())
    }

    async fn activate_extension(&self, ext: &ActiveExtension) -> PluginResult<()> {
        let plugin_id = ext.plugin_id();

        if ext.hooks.services {
            let ctx = self.context_for(ext).await;
            let services = ext
                .extension
                .services(&ctx)
                .instrument(ctx.span().clone())
                .await
                .map_err(|e| PluginError::hook(plugin_id, Hook::Services, e))?;
            self.services
                .write()
                .await
                .combine(self.store.as_ref(), &self.scope, plugin_id, services)
                .await?;
        }

        if ext.hooks.components {
            let ctx = self.context_for(ext).await;
            let components = ext
                .extension
                .components(&ctx)
                .instrument(ctx.span().clone())
                .await
                .map_err(|e| PluginError::hook(plugin_id, Hook::Components, e))?;
            self.components.write().await.combine(plugin_id, components)?;
        }

        if ext.hooks.routes {
            let ctx = self.context_for(ext).await;
            let mut routes = RouteContext::new(plugin_id.clone());
            ext.extension
                .routes(&ctx, &mut routes)
                .instrument(ctx.span().clone())
                .await
                .map_err(|e| PluginError::hook(plugin_id, Hook::Routes, e))?;
            self.routes.write().await.extend(routes.into_mounts());
        }

        if ext.hooks.on_activate {
            let ctx = self.context_for(ext).await;
            ext.extension
                .on_activate(&ctx)
                .instrument(ctx.span().clone())
                .await
                .map_err(|e| PluginError::hook(plugin_id, Hook::Activate, e))?;
        }

        debug!(plugin_id = %plugin_id, scope = %self.scope, "Activated extension");
        Ok(())
    }

    /// Run `on_deactivate` in reverse activation order and clear the
    /// registries.
    ///
    /// Every hook runs even if an earlier one fails; the first failure is
    /// reported alongside the lifecycle payload.
    pub(crate) async fn deactivate(&self) -> PluginResult<Deactivation> {
        let mut lifecycle = self.lifecycle.lock().await;
        let state = self.state();
        if state != ScopeState::Active {
            return Err(PluginError::ScopeFailed {
                scope: self.scope.clone(),
                reason: format!("cannot deactivate from state {state}"),
            });
        }
        self.set_state(ScopeState::Deactivating);

        let mut first_error = None;
        for ext in lifecycle.extensions.iter().rev() {
            if !ext.hooks.on_deactivate {
                continue;
            }
            let ctx = self.context_for(ext).await;
            if let Err(e) = ext
                .extension
                .on_deactivate(&ctx)
                .instrument(ctx.span().clone())
                .await
            {
                warn!(plugin_id = %ext.plugin_id(), error = %e, "Extension failed to deactivate");
                if first_error.is_none() {
                    first_error = Some(PluginError::hook(ext.plugin_id(), Hook::Deactivate, e));
                }
            }
        }

        let plugins: Vec<PluginId> = lifecycle
            .extensions
            .drain(..)
            .map(|e| e.installation.plugin_id)
            .collect();
        let activation_id = lifecycle.activation_id.take();
        self.clear_registries().await;
        self.set_state(ScopeState::Unloaded);
        drop(lifecycle);

        info!(scope = %self.scope, extensions = plugins.len(), "Scope deactivated");
        Ok(Deactivation {
            lifecycle: activation_id.map(|activation_id| ScopeLifecycle {
                scope: self.scope.clone(),
                activation_id,
                plugins,
            }),
            first_error,
        })
    }

    async fn context_for(&self, ext: &ActiveExtension) -> PluginContext {
        PluginContext::new(
            ext.installation.clone(),
            ext.config.clone(),
            self.services.read().await.snapshot(),
            Arc::clone(&self.events),
        )
    }

    async fn clear_registries(&self) {
        self.services.write().await.clear();
        self.components.write().await.clear();
        self.routes.write().await.clear();
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("scope", &self.scope)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(PluginId, Vec<PluginId>);

    fn item(id: &str, deps: &[&str]) -> Item {
        Item(
            PluginId::from_static(id),
            deps.iter().map(|d| PluginId::from_static(d)).collect(),
        )
    }

    fn order(items: Vec<Item>) -> PluginResult<Vec<String>> {
        order_by_dependencies(items, |i| &i.0, |i| i.1.as_slice())
            .map(|v| v.into_iter().map(|i| i.0.to_string()).collect())
    }

    #[test]
    fn test_order_without_dependencies_is_stable() {
        let ordered = order(vec![item("c", &[]), item("a", &[]), item("b", &[])]).unwrap();
        assert_eq!(ordered, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dependencies_come_first() {
        let ordered = order(vec![
            item("app", &["storage", "auth"]),
            item("auth", &[]),
            item("other", &[]),
            item("storage", &["auth"]),
        ])
        .unwrap();
        assert_eq!(ordered, vec!["auth", "other", "storage", "app"]);
    }

    #[test]
    fn test_missing_dependency() {
        let err = order(vec![item("app", &["ghost"])]).unwrap_err();
        assert!(matches!(
            err,
            PluginError::DependencyMissing { ref dependency, .. } if dependency.as_str() == "ghost"
        ));
    }

    #[test]
    fn test_cycle() {
        let err = order(vec![item("free", &[]), item("a", &["b"]), item("b", &["a"])]).unwrap_err();
        let PluginError::DependencyCycle { plugins } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(plugins.len(), 2);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        assert!(matches!(
            order(vec![item("loop", &["loop"])]),
            Err(PluginError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ScopeState::Active.to_string(), "active");
        assert_eq!(ScopeState::Failed("boom".into()).to_string(), "failed: boom");
    }
}

//! Scope-keyed entry point of the runtime.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use ferrule_core::Scope;
use ferrule_events::EventBus;
use ferrule_storage::PluginStore;

use crate::error::PluginResult;
use crate::events::{ScopeActivated, ScopeDeactivated, ScopeLifecycle};
use crate::handle::ScopeHandle;
use crate::loader::ExtensionLoader;

type ScopeSlot = Arc<OnceCell<Arc<ScopeHandle>>>;

/// Activates scopes on first use and hands out their handles.
///
/// Each scope is activated at most once at a time: concurrent callers of
/// [`get`](Self::get) for the same scope wait on a single activation. A
/// failed activation leaves the slot empty, so the next call retries.
///
/// Activation and deactivation of one scope are serialized by a per-scope
/// gate. Lifecycle events are emitted after the gate is released, so
/// subscribers may call back into the registry.
pub struct PluginRegistry {
    store: Arc<dyn PluginStore>,
    loader: Arc<dyn ExtensionLoader>,
    events: Arc<EventBus>,
    scopes: DashMap<Scope, ScopeSlot>,
    gates: DashMap<Scope, Arc<Mutex<()>>>,
}

impl PluginRegistry {
    /// Create a registry with its own event bus.
    #[must_use]
    pub fn new(store: Arc<dyn PluginStore>, loader: Arc<dyn ExtensionLoader>) -> Self {
        Self {
            store,
            loader,
            events: Arc::new(EventBus::new()),
            scopes: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Share an existing event bus with extensions.
    #[must_use]
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// The bus handed to extensions and used for lifecycle events.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn slot(&self, scope: &Scope) -> ScopeSlot {
        Arc::clone(self.scopes.entry(scope.clone()).or_default().value())
    }

    fn gate(&self, scope: &Scope) -> Arc<Mutex<()>> {
        Arc::clone(self.gates.entry(scope.clone()).or_default().value())
    }

    /// The activated handle for `scope`, activating it first if needed.
    ///
    /// Waits for a deactivation of the same scope that is in progress.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted activation: a storage failure, a load
    /// or dependency error, a registry validation or consistency error, or
    /// a failing extension hook.
    pub async fn get(&self, scope: &Scope) -> PluginResult<Arc<ScopeHandle>> {
        if let Some(handle) = self.slot(scope).get() {
            return Ok(Arc::clone(handle));
        }

        let gate = self.gate(scope);
        let guard = gate.lock().await;
        // A deactivation may have replaced the slot while we waited.
        let slot = self.slot(scope);
        let activated = OnceLock::new();
        let handle = slot
            .get_or_try_init(|| async {
                let handle = Arc::new(ScopeHandle::new(
                    scope.clone(),
                    Arc::clone(&self.store),
                    Arc::clone(&self.loader),
                    Arc::clone(&self.events),
                ));
                let lifecycle = handle.activate().await?;
                let _ = activated.set(lifecycle);
                PluginResult::Ok(handle)
            })
            .await
            .map(Arc::clone)?;
        drop(guard);

        if let Some(lifecycle) = activated.into_inner() {
            self.announce::<ScopeActivated>(lifecycle).await;
        }
        Ok(handle)
    }

    async fn announce<E>(&self, lifecycle: ScopeLifecycle)
    where
        E: ferrule_events::Event<Payload = ScopeLifecycle>,
    {
        let scope = lifecycle.scope.clone();
        if let Err(e) = self.events.emit::<E>(lifecycle).await {
            warn!(scope = %scope, event = E::NAME, error = %e, "Lifecycle subscriber failed");
        }
    }

    /// Whether `scope` has an activated handle.
    #[must_use]
    pub fn is_active(&self, scope: &Scope) -> bool {
        self.scopes
            .get(scope)
            .is_some_and(|slot| slot.initialized())
    }

    /// Scopes with an activated handle, sorted.
    #[must_use]
    pub fn active_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self
            .scopes
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        scopes.sort();
        scopes
    }

    /// Deactivate `scope` and forget its handle. Returns `false` if the
    /// scope was not active.
    ///
    /// An activation in progress is awaited first and then deactivated.
    /// Handles obtained earlier stay usable but hold empty registries.
    ///
    /// # Errors
    ///
    /// Returns the first `on_deactivate` failure; the scope is deactivated
    /// regardless.
    pub async fn deactivate(&self, scope: &Scope) -> PluginResult<bool> {
        let gate = self.gate(scope);
        let guard = gate.lock().await;
        let Some((_, slot)) = self.scopes.remove(scope) else {
            return Ok(false);
        };
        let Some(handle) = slot.get() else {
            return Ok(false);
        };
        let outcome = handle.deactivate().await?;
        drop(guard);

        if let Some(lifecycle) = outcome.lifecycle {
            self.announce::<ScopeDeactivated>(lifecycle).await;
        }
        outcome.first_error.map_or(Ok(true), Err)
    }

    /// Deactivate every scope.
    ///
    /// # Errors
    ///
    /// Returns the first failure after every scope has been deactivated.
    pub async fn shutdown(&self) -> PluginResult<()> {
        let scopes: Vec<Scope> = self.scopes.iter().map(|e| e.key().clone()).collect();
        let mut first_error = None;
        for scope in &scopes {
            if let Err(e) = self.deactivate(scope).await {
                warn!(scope = %scope, error = %e, "Scope deactivation failed during shutdown");
                first_error.get_or_insert(e);
            }
        }
        info!(scopes = scopes.len(), "Plugin registry shut down");
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("active_scopes", &self.active_scopes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use ferrule_capabilities::{CapabilityResult, Service, Token, Tokenizer, TokenizerCapability};
    use ferrule_core::{CapabilityType, PluginId};
    use ferrule_events::SubscriberResult;
    use ferrule_storage::{ExtensionRecord, MemoryPluginStore};

    use super::*;
    use crate::components::Component;
    use crate::context::{PluginContext, RouteContext};
    use crate::error::{Hook, HookResult, PluginError};
    use crate::events::{ScopeActivated, ScopeDeactivated};
    use crate::extension::{Extension, ExtensionMetadata};
    use crate::handle::ScopeState;
    use crate::loader::StaticCatalog;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Echo(&'static str);

    #[async_trait]
    impl Tokenizer for Echo {
        fn id(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            0
        }

        async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>> {
            Ok(vec![Token::new("text", source, 0, source.len())])
        }
    }

    struct Recorder {
        id: PluginId,
        depends_on: Vec<PluginId>,
        fail: Option<Hook>,
        log: Log,
        loads: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn record(&self, hook: Hook) -> HookResult<()> {
            self.log.lock().unwrap().push(format!("{}:{hook}", self.id));
            if self.fail == Some(hook) {
                return Err(format!("{hook} refused").into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Extension for Recorder {
        fn id(&self) -> &PluginId {
            &self.id
        }

        fn metadata(&self) -> ExtensionMetadata {
            ExtensionMetadata {
                depends_on: self.depends_on.clone(),
                ..ExtensionMetadata::default()
            }
        }

        async fn services(&self, _ctx: &PluginContext) -> HookResult<Vec<Service>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.record(Hook::Services)?;
            Ok(vec![Service::tokenizer(Echo("echo"))])
        }

        async fn components(&self, _ctx: &PluginContext) -> HookResult<Vec<Component>> {
            self.record(Hook::Components)?;
            Ok(vec![Component::new("recorder-panel", "sidebar", "panel.js")])
        }

        async fn routes(&self, _ctx: &PluginContext, routes: &mut RouteContext) -> HookResult<()> {
            self.record(Hook::Routes)?;
            routes.mount("/status", "status");
            Ok(())
        }

        async fn on_activate(&self, ctx: &PluginContext) -> HookResult<()> {
            assert!(ctx.resolve::<TokenizerCapability>(&self.id, "echo").is_some());
            self.record(Hook::Activate)
        }

        async fn on_deactivate(&self, _ctx: &PluginContext) -> HookResult<()> {
            self.record(Hook::Deactivate)
        }
    }

    struct Fixture {
        registry: PluginRegistry,
        log: Log,
        activations: Arc<AtomicUsize>,
    }

    /// Installs `(id, depends_on, failing hook)` globally in the given order.
    async fn fixture(specs: &[(&'static str, &[&'static str], Option<Hook>)]) -> Fixture {
        let store = Arc::new(MemoryPluginStore::new());
        let log: Log = Arc::default();
        let activations = Arc::new(AtomicUsize::new(0));
        let mut catalog = StaticCatalog::new();

        for &(id, deps, fail) in specs {
            let plugin_id = PluginId::from_static(id);
            store
                .import_extension(ExtensionRecord::new(plugin_id.clone()))
                .await
                .unwrap();
            let installation = store
                .install(Scope::global(), plugin_id.clone(), json!({}))
                .await
                .unwrap();
            store
                .bind_service(installation.id, CapabilityType::Tokenizer, "echo")
                .await
                .unwrap();

            let depends_on: Vec<PluginId> = deps.iter().map(|d| PluginId::from_static(d)).collect();
            let log = Arc::clone(&log);
            let loads = Arc::clone(&activations);
            catalog.register(plugin_id.clone(), json!({}), move || {
                Arc::new(Recorder {
                    id: plugin_id.clone(),
                    depends_on: depends_on.clone(),
                    fail,
                    log: Arc::clone(&log),
                    loads: Arc::clone(&loads),
                })
            });
        }

        Fixture {
            registry: PluginRegistry::new(store, Arc::new(catalog)),
            log,
            activations,
        }
    }

    #[tokio::test]
    async fn test_get_activates_scope() {
        let fx = fixture(&[("alpha", &[], None), ("beta", &[], None)]).await;
        let handle = fx.registry.get(&Scope::global()).await.unwrap();

        assert_eq!(handle.state(), ScopeState::Active);
        assert!(handle.activation_id().await.is_some());
        assert_eq!(handle.plugins().await.len(), 2);
        assert_eq!(handle.services().await.len(), 2);
        assert_eq!(handle.components().await.get_slot("sidebar").len(), 2);

        let routes = handle.routes().await;
        assert_eq!(routes[0].path, "/plugins/alpha/status");
        assert_eq!(routes[1].path, "/plugins/beta/status");

        let log = fx.log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "alpha:services",
                "alpha:components",
                "alpha:routes",
                "alpha:on_activate",
                "beta:services",
                "beta:components",
                "beta:routes",
                "beta:on_activate",
            ]
        );
        assert_eq!(fx.registry.active_scopes(), vec![Scope::global()]);
    }

    #[tokio::test]
    async fn test_get_is_memoized() {
        let fx = fixture(&[("alpha", &[], None)]).await;
        let first = fx.registry.get(&Scope::global()).await.unwrap();
        let second = fx.registry.get(&Scope::global()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fx.activations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_activation_rolls_back_and_retries() {
        let fx = fixture(&[
            ("alpha", &[], None),
            ("beta", &[], None),
            ("gamma", &[], Some(Hook::Services)),
        ])
        .await;

        let err = fx.registry.get(&Scope::global()).await.unwrap_err();
        assert!(matches!(
            err,
            PluginError::HookFailed { hook: Hook::Services, ref plugin_id, .. } if plugin_id.as_str() == "gamma"
        ));
        assert!(!fx.registry.is_active(&Scope::global()));
        assert!(fx.registry.active_scopes().is_empty());

        // The slot stays empty, so the next call runs a fresh activation.
        assert!(fx.registry.get(&Scope::global()).await.is_err());
        assert_eq!(fx.activations.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_deactivate_runs_in_reverse_order() {
        let fx = fixture(&[("base", &[], None), ("app", &["base"], None)]).await;
        let handle = fx.registry.get(&Scope::global()).await.unwrap();
        fx.log.lock().unwrap().clear();

        assert!(fx.registry.deactivate(&Scope::global()).await.unwrap());
        assert_eq!(
            fx.log.lock().unwrap().clone(),
            vec!["app:on_deactivate", "base:on_deactivate"]
        );
        assert_eq!(handle.state(), ScopeState::Unloaded);
        assert!(handle.services().await.is_empty());
        assert!(handle.routes().await.is_empty());
        assert!(!fx.registry.deactivate(&Scope::global()).await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivate_error_still_clears() {
        let fx = fixture(&[
            ("first", &[], Some(Hook::Deactivate)),
            ("second", &[], None),
        ])
        .await;
        let handle = fx.registry.get(&Scope::global()).await.unwrap();

        let err = fx.registry.deactivate(&Scope::global()).await.unwrap_err();
        assert!(matches!(err, PluginError::HookFailed { hook: Hook::Deactivate, .. }));
        assert_eq!(handle.state(), ScopeState::Unloaded);
        assert!(handle.components().await.is_empty());
        assert!(fx.log.lock().unwrap().contains(&"first:on_deactivate".to_string()));
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let fx = fixture(&[("alpha", &[], None)]).await;
        let seen: Log = Arc::default();
        let on_activate = Arc::clone(&seen);
        fx.registry
            .events()
            .subscribe_sync::<ScopeActivated, _>(move |payload| {
                on_activate
                    .lock()
                    .unwrap()
                    .push(format!("activated:{}", payload.plugins.len()));
                Ok(None)
            });
        let on_deactivate = Arc::clone(&seen);
        fx.registry
            .events()
            .subscribe_sync::<ScopeDeactivated, _>(move |payload| {
                on_deactivate
                    .lock()
                    .unwrap()
                    .push(format!("deactivated:{}", payload.scope));
                Ok(None)
            });

        fx.registry.get(&Scope::global()).await.unwrap();
        fx.registry.shutdown().await.unwrap();
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec!["activated:1", "deactivated:global"]
        );
    }

    #[tokio::test]
    async fn test_failing_lifecycle_subscriber_is_not_fatal() {
        let fx = fixture(&[("alpha", &[], None)]).await;
        fx.registry
            .events()
            .subscribe_sync::<ScopeActivated, _>(|_| Err("listener broke".into()));
        let handle = fx.registry.get(&Scope::global()).await.unwrap();
        assert_eq!(handle.state(), ScopeState::Active);
    }

    #[tokio::test]
    async fn test_empty_scope_activates() {
        let fx = fixture(&[]).await;
        let handle = fx
            .registry
            .get(&Scope::user("u-1").unwrap())
            .await
            .unwrap();
        assert!(handle.services().await.is_empty());
        assert!(handle.plugins().await.is_empty());
    }

    /// Sleeps inside `on_activate` and `on_deactivate` to widen lifecycle
    /// races.
    struct Slow {
        id: PluginId,
        log: Log,
    }

    #[async_trait]
    impl Extension for Slow {
        fn id(&self) -> &PluginId {
            &self.id
        }

        async fn on_activate(&self, _ctx: &PluginContext) -> HookResult<()> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.log.lock().unwrap().push("on_activate".to_string());
            Ok(())
        }

        async fn on_deactivate(&self, _ctx: &PluginContext) -> HookResult<()> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.log.lock().unwrap().push("on_deactivate".to_string());
            Ok(())
        }
    }

    async fn slow_registry() -> (Arc<PluginRegistry>, Log) {
        let store = Arc::new(MemoryPluginStore::new());
        let plugin_id = PluginId::from_static("slow");
        store
            .import_extension(ExtensionRecord::new(plugin_id.clone()))
            .await
            .unwrap();
        store
            .install(Scope::global(), plugin_id.clone(), json!({}))
            .await
            .unwrap();

        let log: Log = Arc::default();
        let factory_log = Arc::clone(&log);
        let catalog = StaticCatalog::new().with_extension(plugin_id.clone(), json!({}), move || {
            Arc::new(Slow {
                id: plugin_id.clone(),
                log: Arc::clone(&factory_log),
            })
        });
        (Arc::new(PluginRegistry::new(store, Arc::new(catalog))), log)
    }

    #[tokio::test]
    async fn test_deactivate_waits_for_activation_in_flight() {
        let (registry, log) = slow_registry().await;
        let pending = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.get(&Scope::global()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(registry.deactivate(&Scope::global()).await.unwrap());
        let handle = pending.await.unwrap().unwrap();

        assert_eq!(handle.state(), ScopeState::Unloaded);
        assert!(!registry.is_active(&Scope::global()));
        assert!(registry.active_scopes().is_empty());
        assert_eq!(log.lock().unwrap().clone(), vec!["on_activate", "on_deactivate"]);
    }

    #[tokio::test]
    async fn test_get_waits_for_deactivation_in_flight() {
        let (registry, log) = slow_registry().await;
        let first = registry.get(&Scope::global()).await.unwrap();

        let deactivating = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.deactivate(&Scope::global()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = registry.get(&Scope::global()).await.unwrap();
        assert!(deactivating.await.unwrap().unwrap());

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.state(), ScopeState::Unloaded);
        assert_eq!(second.state(), ScopeState::Active);
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["on_activate", "on_deactivate", "on_activate"]
        );
    }

    #[tokio::test]
    async fn test_activation_subscriber_can_reenter_get() {
        let fx = fixture(&[("alpha", &[], None)]).await;
        let registry = Arc::new(fx.registry);
        let observed: Arc<Mutex<Vec<(bool, ScopeState)>>> = Arc::default();

        let weak = Arc::downgrade(&registry);
        let sink = Arc::clone(&observed);
        registry
            .events()
            .subscribe::<ScopeActivated, _, _>(move |payload| {
                let weak = weak.clone();
                let sink = Arc::clone(&sink);
                async move {
                    if let Some(registry) = weak.upgrade() {
                        let active = registry.is_active(&payload.scope);
                        let handle = registry.get(&payload.scope).await?;
                        sink.lock().unwrap().push((active, handle.state()));
                    }
                    SubscriberResult::<ScopeLifecycle>::Ok(None)
                }
            });

        let handle = tokio::time::timeout(Duration::from_secs(2), registry.get(&Scope::global()))
            .await
            .expect("activation deadlocked")
            .unwrap();

        assert_eq!(handle.state(), ScopeState::Active);
        assert_eq!(
            observed.lock().unwrap().clone(),
            vec![(true, ScopeState::Active)]
        );
        assert_eq!(fx.activations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deactivation_subscriber_can_reenter_get() {
        let fx = fixture(&[("alpha", &[], None)]).await;
        let registry = Arc::new(fx.registry);
        let weak = Arc::downgrade(&registry);
        registry
            .events()
            .subscribe::<ScopeDeactivated, _, _>(move |payload| {
                let weak = weak.clone();
                async move {
                    if let Some(registry) = weak.upgrade() {
                        registry.get(&payload.scope).await?;
                    }
                    SubscriberResult::<ScopeLifecycle>::Ok(None)
                }
            });

        registry.get(&Scope::global()).await.unwrap();
        let deactivated = tokio::time::timeout(
            Duration::from_secs(2),
            registry.deactivate(&Scope::global()),
        )
        .await
        .expect("deactivation deadlocked")
        .unwrap();

        assert!(deactivated);
        // The subscriber brought the scope back up.
        assert!(registry.is_active(&Scope::global()));
        assert_eq!(fx.activations.load(Ordering::SeqCst), 2);
    }
}

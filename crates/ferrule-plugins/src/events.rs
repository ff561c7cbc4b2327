//! Lifecycle events emitted on the host's event bus.

use ferrule_core::{PluginId, Scope};
use ferrule_events::Event;
use uuid::Uuid;

/// Payload of the scope lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeLifecycle {
    /// The scope.
    pub scope: Scope,
    /// Identifies one activation; deactivation carries the same id.
    pub activation_id: Uuid,
    /// Extensions in activation order.
    pub plugins: Vec<PluginId>,
}

/// Emitted after a scope finished activating.
#[derive(Debug, Clone, Copy)]
pub struct ScopeActivated;

impl Event for ScopeActivated {
    const NAME: &'static str = "scope_activated";
    type Payload = ScopeLifecycle;
}

/// Emitted after a scope finished deactivating.
#[derive(Debug, Clone, Copy)]
pub struct ScopeDeactivated;

impl Event for ScopeDeactivated {
    const NAME: &'static str = "scope_deactivated";
    type Payload = ScopeLifecycle;
}

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Identity
pub use crate::{InstallationId, PluginId, ServiceBindingId};

// Scopes and capabilities
pub use crate::{CapabilityType, Scope, ScopeType};

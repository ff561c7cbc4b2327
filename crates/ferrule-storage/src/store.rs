//! The read interface the runtime consumes.

use async_trait::async_trait;

use ferrule_core::{CapabilityType, InstallationId, PluginId, Scope};

use crate::error::StorageResult;
use crate::records::{Installation, ServiceBinding};

/// Read access to installation and service binding records.
///
/// Implementations must be safe to share across concurrent scope
/// activations; any transactional guarantees are their own.
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// The installation of `plugin_id` in `scope`, if any.
    async fn find_installation(
        &self,
        scope: &Scope,
        plugin_id: &PluginId,
    ) -> StorageResult<Option<Installation>>;

    /// Every installation in `scope`, in installation order (ascending id).
    async fn list_installations(&self, scope: &Scope) -> StorageResult<Vec<Installation>>;

    /// Every binding matching the triple.
    ///
    /// Returns a vector rather than an option so callers can detect
    /// duplicated rows; a consistent store yields at most one.
    async fn find_service_bindings(
        &self,
        installation_id: InstallationId,
        capability_type: CapabilityType,
        capability_id: &str,
    ) -> StorageResult<Vec<ServiceBinding>>;
}

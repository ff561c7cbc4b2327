//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferrule_core::{CapabilityType, InstallationId, PluginId, Scope, ServiceBindingId};

/// An imported extension package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// Globally unique extension id.
    pub id: PluginId,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub overview: Option<String>,
    /// Icon asset path.
    #[serde(default)]
    pub icon: Option<String>,
    /// Whether the package came from outside the host distribution.
    #[serde(default)]
    pub external: bool,
    /// When the package was imported.
    pub imported_at: DateTime<Utc>,
}

impl ExtensionRecord {
    /// A record named after its id, imported now.
    #[must_use]
    pub fn new(id: PluginId) -> Self {
        Self {
            name: id.to_string(),
            id,
            overview: None,
            icon: None,
            external: false,
            imported_at: Utc::now(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the overview text.
    #[must_use]
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    /// Mark the package as externally sourced.
    #[must_use]
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

/// One extension enabled in one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    /// Row id; also defines installation order within a scope.
    pub id: InstallationId,
    /// Where the extension is enabled.
    pub scope: Scope,
    /// Free-form scope metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// The installed extension.
    pub plugin_id: PluginId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last metadata change.
    pub updated_at: DateTime<Utc>,
}

/// The persistent identity of one capability implementation within an
/// installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceBinding {
    /// Row id, usable as a foreign key by other subsystems.
    pub id: ServiceBindingId,
    /// Owning installation.
    pub installation_id: InstallationId,
    /// Capability type of the implementation.
    pub capability_type: CapabilityType,
    /// Extension-chosen capability id, unique per (installation, type).
    pub capability_id: String,
}

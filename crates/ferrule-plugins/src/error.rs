//! Plugin runtime error types.

use std::fmt;

use ferrule_core::{CapabilityType, CoreError, PluginId, Scope};
use ferrule_storage::StorageError;

/// Error type returned by extension hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for extension hooks.
pub type HookResult<T> = Result<T, HookError>;

/// The extension hook an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// [`Extension::services`](crate::Extension::services).
    Services,
    /// [`Extension::components`](crate::Extension::components).
    Components,
    /// [`Extension::routes`](crate::Extension::routes).
    Routes,
    /// [`Extension::on_activate`](crate::Extension::on_activate).
    Activate,
    /// [`Extension::on_deactivate`](crate::Extension::on_deactivate).
    Deactivate,
}

impl Hook {
    /// The hook's method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Components => "components",
            Self::Routes => "routes",
            Self::Activate => "on_activate",
            Self::Deactivate => "on_deactivate",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_ids(ids: &[PluginId]) -> String {
    ids.iter()
        .map(PluginId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from extension loading, activation and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The loader could not produce the extension.
    #[error("extension load failed: {plugin_id} - {message}")]
    LoadFailed {
        /// The extension that failed to load.
        plugin_id: PluginId,
        /// Failure reason.
        message: String,
    },

    /// An extension depends on one that is not installed in the scope.
    #[error("extension {plugin_id} depends on {dependency}, which is not installed in this scope")]
    DependencyMissing {
        /// The dependent extension.
        plugin_id: PluginId,
        /// The missing dependency.
        dependency: PluginId,
    },

    /// Declared dependencies form a cycle.
    #[error("dependency cycle among extensions: {}", join_ids(.plugins))]
    DependencyCycle {
        /// Extensions that could not be ordered.
        plugins: Vec<PluginId>,
    },

    /// An extension hook returned an error.
    #[error("extension {plugin_id} failed in {hook}: {source}")]
    HookFailed {
        /// The failing extension.
        plugin_id: PluginId,
        /// The hook that failed.
        hook: Hook,
        /// The hook's error.
        #[source]
        source: HookError,
    },

    /// Persisted bindings disagree with the services an extension offers.
    #[error(
        "extension {plugin_id} offers {capability_type} '{capability_id}' but the store holds {bindings} matching bindings (expected 1)"
    )]
    Consistency {
        /// The offering extension.
        plugin_id: PluginId,
        /// Capability type of the offered service.
        capability_type: CapabilityType,
        /// Capability id of the offered service.
        capability_id: String,
        /// Number of bindings found.
        bindings: usize,
    },

    /// A contributed service or component is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The extension is not installed in the scope.
    #[error("extension {plugin_id} is not installed in {scope}")]
    InstallationNotFound {
        /// The extension.
        plugin_id: PluginId,
        /// The scope searched.
        scope: Scope,
    },

    /// The persistence layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An identifier or scope string is malformed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A scope lifecycle operation is not allowed in the current state.
    #[error("scope {scope} failed: {reason}")]
    ScopeFailed {
        /// The scope.
        scope: Scope,
        /// Why the operation failed.
        reason: String,
    },
}

impl From<CoreError> for PluginError {
    fn from(e: CoreError) -> Self {
        Self::InvalidId(e.to_string())
    }
}

impl PluginError {
    pub(crate) fn hook(plugin_id: &PluginId, hook: Hook, source: HookError) -> Self {
        Self::HookFailed {
            plugin_id: plugin_id.clone(),
            hook,
            source,
        }
    }
}

/// Result type for plugin runtime operations.
pub type PluginResult<T> = Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_failed_display() {
        let err = PluginError::hook(
            &PluginId::from_static("s3-storage"),
            Hook::Activate,
            "bucket missing".into(),
        );
        assert_eq!(
            err.to_string(),
            "extension s3-storage failed in on_activate: bucket missing"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cycle_display_lists_ids() {
        let err = PluginError::DependencyCycle {
            plugins: vec![PluginId::from_static("a"), PluginId::from_static("b")],
        };
        assert_eq!(err.to_string(), "dependency cycle among extensions: a, b");
    }

    #[test]
    fn test_core_error_maps_to_invalid_id() {
        let err: PluginError = PluginId::new("Bad Id").unwrap_err().into();
        assert!(matches!(err, PluginError::InvalidId(_)));
    }
}

//! Configuration struct definitions.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ferrule_core::{PluginId, Scope};

use crate::error::{ConfigError, ConfigResult};

/// The complete Ferrule configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging setup.
    pub logging: LoggingConfig,
    /// Event bus behavior.
    pub events: EventsConfig,
    /// Per-extension configuration values keyed by extension id.
    pub extensions: BTreeMap<String, serde_json::Value>,
    /// Installations to seed the host's store with.
    pub installations: Vec<InstallationConfig>,
}

impl Config {
    /// The host-side configuration value for an extension, if any.
    #[must_use]
    pub fn extension_config(&self, plugin_id: &str) -> Option<&serde_json::Value> {
        self.extensions.get(plugin_id)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter level.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    /// `stdout` or `stderr`.
    pub target: String,
    /// Include timestamps.
    pub timestamps: bool,
    /// Emit span open/close events.
    pub span_events: bool,
    /// Use ANSI colors.
    pub ansi: bool,
    /// Per-target filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            target: "stderr".to_owned(),
            timestamps: true,
            span_events: false,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

/// `[events]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-subscriber time limit in milliseconds. Unset means unlimited.
    pub subscriber_timeout_ms: Option<u64>,
}

impl EventsConfig {
    /// The subscriber timeout as a duration.
    #[must_use]
    pub fn subscriber_timeout(&self) -> Option<Duration> {
        self.subscriber_timeout_ms.map(Duration::from_millis)
    }
}

/// One `[[installations]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationConfig {
    /// Extension id.
    pub extension: String,
    /// Scope in display form: `global`, `project:<id>` or `user:<id>`.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Free-form scope metadata stored on the installation.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_scope() -> String {
    "global".to_owned()
}

impl InstallationConfig {
    /// The parsed extension id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a malformed id.
    pub fn plugin_id(&self) -> ConfigResult<PluginId> {
        PluginId::new(self.extension.as_str()).map_err(|e| ConfigError::ValidationError {
            field: "installations.extension".to_owned(),
            message: e.to_string(),
        })
    }

    /// The parsed scope.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a malformed scope.
    pub fn scope(&self) -> ConfigResult<Scope> {
        self.scope
            .parse()
            .map_err(|e: ferrule_core::CoreError| ConfigError::ValidationError {
                field: "installations.scope".to_owned(),
                message: e.to_string(),
            })
    }
}

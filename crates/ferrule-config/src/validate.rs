//! Post-merge configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest accepted subscriber timeout (one hour).
const MAX_SUBSCRIBER_TIMEOUT_MS: u64 = 3_600_000;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_events(config)?;
    validate_extensions(config)?;
    validate_installations(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!("unsupported format '{}'; expected pretty, compact or json", l.format),
        ));
    }
    if !matches!(l.target.as_str(), "stdout" | "stderr") {
        return Err(invalid(
            "logging.target",
            format!("unsupported target '{}'; expected stdout or stderr", l.target),
        ));
    }
    if let Some(d) = l.directives.iter().find(|d| d.trim().is_empty()) {
        return Err(invalid("logging.directives", format!("empty directive {d:?}")));
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    match config.events.subscriber_timeout_ms {
        Some(0) => Err(invalid(
            "events.subscriber_timeout_ms",
            "must be positive; omit it to disable the timeout",
        )),
        Some(ms) if ms > MAX_SUBSCRIBER_TIMEOUT_MS => Err(invalid(
            "events.subscriber_timeout_ms",
            format!("{ms} exceeds the {MAX_SUBSCRIBER_TIMEOUT_MS} ms limit"),
        )),
        _ => Ok(()),
    }
}

fn validate_extensions(config: &Config) -> ConfigResult<()> {
    for id in config.extensions.keys() {
        if !ferrule_core::PluginId::is_valid_id(id) {
            return Err(invalid(
                format!("extensions.{id}"),
                "section name is not a valid extension id",
            ));
        }
    }
    Ok(())
}

fn validate_installations(config: &Config) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for entry in &config.installations {
        let plugin_id = entry.plugin_id()?;
        let scope = entry.scope()?;
        if !seen.insert((plugin_id.clone(), scope.clone())) {
            return Err(invalid(
                "installations",
                format!("{plugin_id} is installed twice in {scope}"),
            ));
        }
    }
    Ok(())
}

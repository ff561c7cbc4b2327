//! Environment variable fallbacks.
//!
//! Environment variables only fill in values no config file set; a file
//! always wins.

use std::collections::HashMap;

use tracing::debug;

/// Environment variable holding the fallback log filter.
pub const LOG_ENV_VAR: &str = "FERRULE_LOG";

/// Snapshot the `FERRULE_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("FERRULE_"))
        .collect()
}

/// Apply fallbacks to `merged` for fields no file layer set.
///
/// `file_set` reports whether a dotted path was set by a file layer.
/// Returns the number of fields filled in.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
    file_set: impl Fn(&str) -> bool,
) -> usize {
    let mut applied = 0usize;

    if let Some(level) = env_vars.get(LOG_ENV_VAR).filter(|v| !v.trim().is_empty())
        && !file_set("logging.level")
        && let Some(logging) = merged
            .as_table_mut()
            .and_then(|t| t.get_mut("logging"))
            .and_then(toml::Value::as_table_mut)
    {
        logging.insert("level".to_owned(), toml::Value::String(level.clone()));
        debug!(var = LOG_ENV_VAR, "Applied env fallback for logging.level");
        applied = applied.saturating_add(1);
    }

    applied
}

//! Config file discovery and layered loading.
//!
//! `load` runs these steps:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.ferrule/config.toml` (user)
//! 3. Merge `{workspace}/.ferrule/config.toml` (workspace)
//! 4. Fill unset fields from `FERRULE_*` environment variables
//! 5. Deserialize and validate

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Directory name holding Ferrule config under home and workspace roots.
pub const CONFIG_DIR: &str = ".ferrule";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus the files it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Files merged on top of the defaults, lowest precedence first.
    pub loaded_files: Vec<PathBuf>,
}

/// Load with full layering.
///
/// `workspace_root` enables the workspace layer. `home_override` replaces
/// the home directory used to find the user layer.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable or malformed,
/// or if the merged configuration fails validation.
pub fn load(workspace_root: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let home_dir = match home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut file_fields = HashSet::new();
    let mut loaded_files = Vec::new();

    let mut layers = vec![home_dir.join(CONFIG_DIR).join(CONFIG_FILE)];
    if let Some(root) = workspace_root {
        layers.push(root.join(CONFIG_DIR).join(CONFIG_FILE));
    }

    for path in layers {
        if let Some(overlay) = try_load_file(&path)? {
            collect_leaves(&overlay, "", &mut file_fields);
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "Loaded config layer");
            loaded_files.push(path);
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &env_vars, |p| file_fields.contains(p));
    if env_count > 0 {
        debug!(count = env_count, "Applied environment variable fallbacks");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Load a single file on top of the embedded defaults (no user/workspace
/// layers, no environment).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    deep_merge(&mut merged, &overlay);

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Recursively merge `overlay` into `base`. Tables merge per key; scalars
/// and arrays replace.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                    },
                }
            }
        },
        (base, overlay) => *base = overlay.clone(),
    }
}

fn collect_leaves(val: &toml::Value, prefix: &str, out: &mut HashSet<String>) {
    match val {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, &path, out);
            }
        },
        _ => {
            out.insert(prefix.to_owned());
        },
    }
}

/// Read and parse a file, returning `None` if it does not exist.
///
/// The size limit is checked against file metadata before anything is read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let read_error = |source: std::io::Error| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };

    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Config file not found, skipping");
            return Ok(None);
        },
        Err(e) => return Err(read_error(e)),
    };
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(read_error)?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

//! UI micro-component registry.
//!
//! Extensions contribute [`Component`]s for named UI slots. When a batch is
//! combined into the registry each component name gets a short digest
//! suffix derived from `(name, plugin id, slot, url)`, so two extensions
//! shipping a component with the same name never collide, while the same
//! extension always produces the same final name.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ferrule_core::PluginId;

use crate::error::{PluginError, PluginResult};

/// Maximum length of a component name before suffixing.
pub const MAX_COMPONENT_NAME_LEN: usize = 64;

/// Number of hex characters appended to combined component names.
pub const SUFFIX_LEN: usize = 8;

/// A component as contributed by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Kebab-case element name containing at least one hyphen.
    pub name: String,
    /// The UI slot the component renders into.
    pub slot: String,
    /// Relative asset path of the component module.
    pub url: String,
    /// Optional placeholder markup shown while the module loads.
    #[serde(default)]
    pub skeleton: Option<String>,
}

impl Component {
    /// Create a component without a skeleton.
    #[must_use]
    pub fn new(name: impl Into<String>, slot: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: slot.into(),
            url: url.into(),
            skeleton: None,
        }
    }

    /// Set the skeleton markup.
    #[must_use]
    pub fn with_skeleton(mut self, skeleton: impl Into<String>) -> Self {
        self.skeleton = Some(skeleton.into());
        self
    }
}

/// A registered component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Final element name.
    pub name: String,
    /// The UI slot.
    pub slot: String,
    /// Relative asset path.
    pub url: String,
    /// Placeholder markup.
    pub skeleton: Option<String>,
    /// The contributing extension.
    pub plugin_id: PluginId,
}

/// The collision-free name a component receives when combined.
#[must_use]
pub fn suffixed_name(name: &str, plugin_id: &PluginId, slot: &str, url: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [name, plugin_id.as_str(), slot, url] {
        let len = u64::try_from(part.len()).unwrap_or(u64::MAX);
        hasher.update(&len.to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize().to_hex();
    let suffix = digest.get(..SUFFIX_LEN).unwrap_or(digest.as_str());
    format!("{name}-{suffix}")
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > MAX_COMPONENT_NAME_LEN {
        return Err(format!(
            "component name must be 1-{MAX_COMPONENT_NAME_LEN} characters, got {}",
            name.len()
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "component name must be lowercase kebab-case, got: {name}"
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(format!("component name must start with a letter, got: {name}"));
    }
    if !name.contains('-') {
        return Err(format!("component name must contain a hyphen, got: {name}"));
    }
    if name.ends_with('-') || name.contains("--") {
        return Err(format!("component name has an empty segment: {name}"));
    }
    Ok(())
}

fn validate_slot(slot: &str) -> Result<(), String> {
    if slot.is_empty() {
        return Err("component slot must not be empty".into());
    }
    if !slot
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(format!("component slot contains invalid characters: {slot}"));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("component url must not be empty".into());
    }
    if url.starts_with('/') || url.starts_with('\\') {
        return Err(format!("component url must be relative, got: {url}"));
    }
    let has_scheme = url.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    if has_scheme {
        return Err(format!("component url must not carry a scheme, got: {url}"));
    }
    if url.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("component url must not traverse upwards, got: {url}"));
    }
    Ok(())
}

fn validate(component: &Component) -> Result<(), String> {
    validate_name(&component.name)
        .and_then(|()| validate_slot(&component.slot))
        .and_then(|()| validate_url(&component.url))
}

/// Registered components of one scope.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    records: Vec<ComponentRecord>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is; the name is not suffixed.
    pub fn register(&mut self, record: ComponentRecord) {
        debug!(
            name = %record.name,
            slot = %record.slot,
            plugin_id = %record.plugin_id,
            "Registered component"
        );
        self.records.push(record);
    }

    /// Validate and suffix a batch from one extension, then append it.
    ///
    /// Returns the final names in batch order. Nothing is inserted unless
    /// every component is valid and every final name is unique.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Validation`] naming the first invalid
    /// component, or the first final name that repeats within the batch or
    /// is already registered.
    pub fn combine(
        &mut self,
        plugin_id: &PluginId,
        batch: Vec<Component>,
    ) -> PluginResult<Vec<String>> {
        for component in &batch {
            validate(component).map_err(|reason| {
                PluginError::Validation(format!("extension {plugin_id}: {reason}"))
            })?;
        }

        let records: Vec<ComponentRecord> = batch
            .into_iter()
            .map(|c| ComponentRecord {
                name: suffixed_name(&c.name, plugin_id, &c.slot, &c.url),
                slot: c.slot,
                url: c.url,
                skeleton: c.skeleton,
                plugin_id: plugin_id.clone(),
            })
            .collect();

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.name.as_str()) || self.find(&record.name).is_some() {
                return Err(PluginError::Validation(format!(
                    "extension {plugin_id}: duplicate component name {}",
                    record.name
                )));
            }
        }

        let names = records.iter().map(|r| r.name.clone()).collect();
        for record in records {
            self.register(record);
        }
        Ok(names)
    }

    /// Components rendering into `slot`, in registration order.
    #[must_use]
    pub fn get_slot(&self, slot: &str) -> Vec<&ComponentRecord> {
        self.records.iter().filter(|r| r.slot == slot).collect()
    }

    /// Components contributed by `plugin_id`, in registration order.
    #[must_use]
    pub fn get(&self, plugin_id: &PluginId) -> Vec<&ComponentRecord> {
        self.records
            .iter()
            .filter(|r| &r.plugin_id == plugin_id)
            .collect()
    }

    /// The component registered under `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ComponentRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Every record in registration order.
    #[must_use]
    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every component.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

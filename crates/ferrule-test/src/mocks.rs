//! Mock extensions and capability implementations.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::io::AsyncReadExt;

use ferrule_capabilities::{
    ByteStream, CapabilityError, CapabilityResult, ObjectMeta, PresignedUrl, Service,
    StorageProvider, Suggestion, SuggestionRequest, Token, Tokenizer, TranslationAdvisor,
};
use ferrule_core::PluginId;
use ferrule_plugins::{
    Component, Extension, ExtensionHooks, ExtensionMetadata, Hook, HookResult, PluginContext,
    RouteContext,
};

/// Shared record of hook invocations, formatted `"{plugin_id}:{hook}"`.
#[derive(Debug, Clone, Default)]
pub struct HookLog(Arc<Mutex<Vec<String>>>);

impl HookLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        if let Ok(mut guard) = self.0.lock() {
            guard.push(entry);
        }
    }

    /// Every recorded call, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Recorded calls of one hook, as plugin ids.
    #[must_use]
    pub fn calls_of(&self, hook: Hook) -> Vec<String> {
        let suffix = format!(":{hook}");
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    /// Forget every recorded call.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.0.lock() {
            guard.clear();
        }
    }
}

/// Configurable [`Extension`] that records its hook calls.
///
/// Cloning shares the log, so a catalog factory can hand out clones.
#[derive(Debug, Clone)]
pub struct MockExtension {
    id: PluginId,
    metadata: ExtensionMetadata,
    hooks: ExtensionHooks,
    services: Vec<Service>,
    components: Vec<Component>,
    routes: Vec<(String, String)>,
    fail_on: Option<Hook>,
    log: HookLog,
}

impl MockExtension {
    /// A mock with no contributions and every hook enabled.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: PluginId::from_static(id),
            metadata: ExtensionMetadata::default(),
            hooks: ExtensionHooks::all(),
            services: Vec::new(),
            components: Vec::new(),
            routes: Vec::new(),
            fail_on: None,
            log: HookLog::new(),
        }
    }

    /// Record into `log` instead of a private log.
    #[must_use]
    pub fn with_log(mut self, log: &HookLog) -> Self {
        self.log = log.clone();
        self
    }

    /// Contribute a service and declare it in the metadata.
    #[must_use]
    pub fn with_service(mut self, service: Service) -> Self {
        self.metadata = self
            .metadata
            .provides(service.capability_type(), service.id());
        self.services.push(service);
        self
    }

    /// Contribute a service without declaring it, so no binding is seeded.
    #[must_use]
    pub fn with_undeclared_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Contribute a component.
    #[must_use]
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Mount `handler` at `path` during the routes hook.
    #[must_use]
    pub fn with_route(mut self, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.routes.push((path.into(), handler.into()));
        self
    }

    /// Declare a dependency.
    #[must_use]
    pub fn depends_on(mut self, id: &str) -> Self {
        self.metadata = self.metadata.depends_on(PluginId::from_static(id));
        self
    }

    /// Make `hook` return an error.
    #[must_use]
    pub fn fail_on(mut self, hook: Hook) -> Self {
        self.fail_on = Some(hook);
        self
    }

    /// Replace the enabled hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: ExtensionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The mock's id.
    #[must_use]
    pub fn plugin_id(&self) -> &PluginId {
        &self.id
    }

    /// The shared call log.
    #[must_use]
    pub fn log(&self) -> &HookLog {
        &self.log
    }

    fn record(&self, hook: Hook) -> HookResult<()> {
        self.log.push(format!("{}:{hook}", self.id));
        if self.fail_on == Some(hook) {
            return Err(format!("{} refused {hook}", self.id).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Extension for MockExtension {
    fn id(&self) -> &PluginId {
        &self.id
    }

    fn metadata(&self) -> ExtensionMetadata {
        self.metadata.clone()
    }

    fn hooks(&self) -> ExtensionHooks {
        self.hooks
    }

    async fn services(&self, _ctx: &PluginContext) -> HookResult<Vec<Service>> {
        self.record(Hook::Services)?;
        Ok(self.services.clone())
    }

    async fn components(&self, _ctx: &PluginContext) -> HookResult<Vec<Component>> {
        self.record(Hook::Components)?;
        Ok(self.components.clone())
    }

    async fn routes(&self, _ctx: &PluginContext, routes: &mut RouteContext) -> HookResult<()> {
        self.record(Hook::Routes)?;
        for (path, handler) in &self.routes {
            routes.mount(path, handler.clone());
        }
        Ok(())
    }

    async fn on_activate(&self, _ctx: &PluginContext) -> HookResult<()> {
        self.record(Hook::Activate)
    }

    async fn on_deactivate(&self, _ctx: &PluginContext) -> HookResult<()> {
        self.record(Hook::Deactivate)
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Tokenizer returning the whole source as a single `text` token.
#[derive(Debug, Clone)]
pub struct MockTokenizer {
    id: String,
    priority: i32,
}

impl MockTokenizer {
    /// Create a tokenizer with the given id and priority.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            priority,
        }
    }
}

#[async_trait]
impl Tokenizer for MockTokenizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>> {
        if source.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Token::new("text", source, 0, source.len())])
    }
}

/// Storage provider keeping objects in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    id: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create an empty store with the given capability id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            objects: Arc::default(),
        }
    }

    fn objects(&self) -> CapabilityResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| CapabilityError::Backend("memory storage lock poisoned".into()))
    }

    fn presign(&self, key: &str, method: &str, ttl: Duration) -> CapabilityResult<PresignedUrl> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| CapabilityError::InvalidInput(format!("ttl out of range: {e}")))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CapabilityError::InvalidInput("ttl out of range".into()))?;
        Ok(PresignedUrl {
            url: format!("memory://{}/{key}", self.id),
            method: method.to_string(),
            expires_at,
        })
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn put_stream(
        &self,
        key: &str,
        mut body: ByteStream,
        content_length: Option<u64>,
    ) -> CapabilityResult<()> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes).await?;
        if let Some(expected) = content_length
            && u64::try_from(bytes.len()).ok() != Some(expected)
        {
            return Err(CapabilityError::InvalidInput(format!(
                "expected {expected} bytes for {key}, got {}",
                bytes.len()
            )));
        }
        self.objects()?.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> CapabilityResult<ByteStream> {
        let bytes = self
            .objects()?
            .get(key)
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(key.to_string()))?;
        Ok(Box::pin(Cursor::new(bytes)))
    }

    async fn presigned_download_url(&self, key: &str, ttl: Duration) -> CapabilityResult<PresignedUrl> {
        self.presign(key, "GET", ttl)
    }

    async fn presigned_upload_url(&self, key: &str, ttl: Duration) -> CapabilityResult<PresignedUrl> {
        self.presign(key, "PUT", ttl)
    }

    async fn head(&self, key: &str) -> CapabilityResult<Option<ObjectMeta>> {
        Ok(self.objects()?.get(key).map(|bytes| ObjectMeta {
            key: key.to_string(),
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            content_type: None,
            last_modified: None,
            etag: None,
        }))
    }

    async fn delete(&self, key: &str) -> CapabilityResult<()> {
        self.objects()?.remove(key);
        Ok(())
    }
}

/// Advisor answering with a fixed suggestion, or always failing.
#[derive(Debug, Clone)]
pub struct MockAdvisor {
    id: String,
    reply: Option<String>,
}

impl MockAdvisor {
    /// An advisor suggesting `reply` for every request.
    #[must_use]
    pub fn replying(id: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reply: Some(reply.into()),
        }
    }

    /// An advisor whose `suggest` always fails.
    #[must_use]
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reply: None,
        }
    }
}

#[async_trait]
impl TranslationAdvisor for MockAdvisor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn can_suggest(&self, _source_language: &str, _target_language: &str) -> bool {
        true
    }

    async fn suggest(&self, _request: &SuggestionRequest) -> CapabilityResult<Vec<Suggestion>> {
        match &self.reply {
            Some(text) => Ok(vec![Suggestion {
                advisor: self.id.clone(),
                text: text.clone(),
                confidence: 1.0,
            }]),
            None => Err(CapabilityError::Unavailable(format!("{} is offline", self.id))),
        }
    }
}

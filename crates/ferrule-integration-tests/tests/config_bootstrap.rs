//! Host configuration flowing into extension contexts.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use ferrule_config::Config;
use ferrule_core::PluginId;
use ferrule_plugins::{Extension, HookResult, PluginContext, PluginRegistry, StaticCatalog};
use ferrule_storage::{ExtensionRecord, MemoryPluginStore};

type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

struct ConfigCapture {
    id: PluginId,
    seen: Seen,
}

#[async_trait]
impl Extension for ConfigCapture {
    fn id(&self) -> &PluginId {
        &self.id
    }

    async fn on_activate(&self, ctx: &PluginContext) -> HookResult<()> {
        self.seen.lock().unwrap().push(json!({
            "config": ctx.config(),
            "metadata": ctx.metadata(),
            "scope": ctx.scope().to_string(),
        }));
        Ok(())
    }
}

#[tokio::test]
async fn configured_installations_activate_with_overlaid_config() {
    let home = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(workspace.path().join(".ferrule")).unwrap();
    std::fs::write(
        workspace.path().join(".ferrule/config.toml"),
        r#"
        [extensions.s3-storage]
        bucket = "team-assets"

        [[installations]]
        extension = "s3-storage"
        scope = "project:7"
        metadata = { owner = "team-a" }
        "#,
    )
    .unwrap();

    let config = Config::load_with_home(Some(workspace.path()), home.path())
        .unwrap()
        .config;

    let store = Arc::new(MemoryPluginStore::new());
    let mut scopes = Vec::new();
    for entry in &config.installations {
        let plugin_id = entry.plugin_id().unwrap();
        let scope = entry.scope().unwrap();
        store
            .import_extension(ExtensionRecord::new(plugin_id.clone()))
            .await
            .unwrap();
        store
            .install(scope.clone(), plugin_id, entry.metadata.clone())
            .await
            .unwrap();
        scopes.push(scope);
    }

    let seen: Seen = Arc::default();
    let capture_seen = Arc::clone(&seen);
    let catalog = StaticCatalog::new()
        .with_extension(
            PluginId::from_static("s3-storage"),
            json!({ "bucket": "default", "region": "eu-west-1" }),
            move || {
                Arc::new(ConfigCapture {
                    id: PluginId::from_static("s3-storage"),
                    seen: Arc::clone(&capture_seen),
                })
            },
        )
        .with_host_config(config.extensions.clone());
    let registry = PluginRegistry::new(store, Arc::new(catalog));

    registry.get(&scopes[0]).await.unwrap();
    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![json!({
            "config": { "bucket": "team-assets", "region": "eu-west-1" },
            "metadata": { "owner": "team-a" },
            "scope": "project:7",
        })]
    );
}

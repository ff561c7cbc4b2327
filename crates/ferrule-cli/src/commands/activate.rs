//! `ferrule activate`: bring a scope up and report what it contributes.

use anyhow::{Context, Result};
use serde::Serialize;

use ferrule_config::Config;
use ferrule_core::{CapabilityType, PluginId, Scope};
use ferrule_plugins::{ComponentRecord, ScopeHandle};

use super::OutputFormat;
use crate::host;

/// One registered service, flattened for printing.
#[derive(Debug, Serialize)]
struct ServiceLine {
    plugin_id: PluginId,
    capability_type: CapabilityType,
    capability_id: String,
    persistent_id: u64,
}

/// One mounted route.
#[derive(Debug, Serialize)]
struct RouteLine {
    plugin_id: PluginId,
    path: String,
    handler: String,
}

/// Everything an active scope contributes.
#[derive(Debug, Serialize)]
pub(crate) struct ScopeReport {
    scope: String,
    activation_id: Option<String>,
    extensions: Vec<PluginId>,
    services: Vec<ServiceLine>,
    components: Vec<ComponentRecord>,
    routes: Vec<RouteLine>,
}

impl ScopeReport {
    pub(crate) async fn collect(handle: &ScopeHandle) -> Self {
        let services = handle
            .services()
            .await
            .snapshot()
            .into_iter()
            .map(|s| ServiceLine {
                plugin_id: s.plugin_id,
                capability_type: s.capability_type,
                capability_id: s.capability_id,
                persistent_id: s.persistent_id.0,
            })
            .collect();
        let components = handle.components().await.records().to_vec();
        let routes = handle
            .routes()
            .await
            .into_iter()
            .map(|r| RouteLine {
                plugin_id: r.plugin_id,
                path: r.path,
                handler: r.handler,
            })
            .collect();

        Self {
            scope: handle.scope().to_string(),
            activation_id: handle.activation_id().await.map(|id| id.to_string()),
            extensions: handle.plugins().await,
            services,
            components,
            routes,
        }
    }

    fn print_pretty(&self) {
        println!("Scope {} is active", self.scope);
        if let Some(id) = &self.activation_id {
            println!("  activation: {id}");
        }

        println!("  extensions ({}):", self.extensions.len());
        for id in &self.extensions {
            println!("    {id}");
        }

        println!("  services ({}):", self.services.len());
        for s in &self.services {
            println!(
                "    {}/{} from {} (binding {})",
                s.capability_type, s.capability_id, s.plugin_id, s.persistent_id
            );
        }

        println!("  components ({}):", self.components.len());
        for c in &self.components {
            println!("    <{}> in {} -> {} ({})", c.name, c.slot, c.url, c.plugin_id);
        }

        if !self.routes.is_empty() {
            println!("  routes ({}):", self.routes.len());
            for r in &self.routes {
                println!("    {} -> {} ({})", r.path, r.handler, r.plugin_id);
            }
        }
    }
}

/// Activate `scope` and print its contributions.
///
/// # Errors
///
/// Fails if the scope string is malformed, the host cannot be bootstrapped
/// or any extension in the scope fails to activate.
pub(crate) async fn run_activate(config: &Config, scope: &str, format: OutputFormat) -> Result<()> {
    let scope: Scope = scope.parse()?;
    let registry = host::bootstrap(config).await?;
    let handle = registry
        .get(&scope)
        .await
        .with_context(|| format!("activating scope {scope}"))?;

    let report = ScopeReport::collect(&handle).await;
    match format {
        OutputFormat::Pretty => report.print_pretty(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    registry.shutdown().await?;
    Ok(())
}

mod admin;
mod cli;
mod global_config;
mod logging;

use std::sync::Arc;

use clap::Parser;
use mcp_router_core::config_model::Instance;
use mcp_router_core::config_store::ConfigStore;
use mcp_router_core::registry::InstanceRegistry;
use mcp_router_core::router::Router;
use mcp_router_core::server::ServerFacade;
use mcp_router_core::watcher::FileWatcher;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    logging::init(cli.data_dir.join("logs"), &cli.log_level)?;

    let global_config = global_config::GlobalConfig::load(cli.data_dir.join("config.json"))?;
    let allow_instance_management = global_config
        .get("server.allow_instance_management")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let bearer_token = global_config
        .get("security.bearer_token")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let server_name = "mcp-router".to_string();
    let server_version = env!("CARGO_PKG_VERSION").to_string();

    let store = ConfigStore::new(cli.data_dir.clone());

    if let cli::Command::Add { instance, provider, display } = &cli.command {
        return run_add(&store, instance, provider, display.as_deref()).await;
    }

    let registry = Arc::new(InstanceRegistry::new(store));
    registry.load_and_connect_all().await?;
    info!(count = registry.names().await.len(), "instances loaded");

    let mut watcher = FileWatcher::start(cli.data_dir.clone())?;

    let router = Arc::new(Router::new(registry.clone()));
    let facade = Arc::new(ServerFacade::new(server_name, server_version, router.clone(), registry.clone(), allow_instance_management));

    let result = match cli.command {
        cli::Command::Stdio => mcp_router_core::server::stdio::run(&facade).await.map_err(anyhow::Error::from),
        cli::Command::Http { bind } => mcp_router_core::server::http::run(facade.clone(), &bind).await.map_err(anyhow::Error::from),
        cli::Command::Sse { bind } => mcp_router_core::server::sse::run(facade.clone(), &bind).await.map_err(anyhow::Error::from),
        cli::Command::Api { bind } => {
            let admin_state = admin::AdminState { router: router.clone(), bearer_token };
            admin::run(admin_state, &bind).await.map_err(anyhow::Error::from)
        }
        cli::Command::Add { .. } => unreachable!("handled above"),
    };

    watcher.stop();
    if let Err(e) = &result {
        error!(error = %e, "server loop exited with an error");
    }
    result
}

/// Scaffold a provider's `mcp_settings.json` with a placeholder command
/// the operator is expected to edit before first use. `instance` and
/// `provider` must match (ASCII); `display` becomes the stored `name`,
/// falling back to `instance` when omitted.
async fn run_add(store: &ConfigStore, instance: &str, provider: &str, display: Option<&str>) -> anyhow::Result<()> {
    if instance != provider {
        anyhow::bail!("instance ('{instance}') must equal provider ('{provider}')");
    }
    if !instance.is_ascii() {
        anyhow::bail!("instance and provider must be ASCII, got '{instance}'");
    }
    let raw = serde_json::json!({
        "name": display.unwrap_or(instance),
        "command": "true",
        "args": [],
    });
    let instance = Instance::from_raw_json(&raw, Some(provider))?;
    store.save_instance(&instance)?;
    println!("Done");
    Ok(())
}

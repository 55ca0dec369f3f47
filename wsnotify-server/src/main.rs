//! wsnotify server
//!
//! Pushes configuration, session and task events to connected WebSocket
//! clients, filtered by topic, session and user.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wsnotify_sdk::objects::EventKind;

/// Event kinds the server itself emits; their topics must be enabled.
const SERVER_EMITTED_KINDS: &[EventKind] = &[EventKind::ServerConfigurationChanged];

/// wsnotify - server-push event notification gateway
#[derive(Parser, Debug)]
#[command(name = "wsnotify-server")]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WSNOTIFY_CONFIG", default_value = "./wsnotify-config.toml")]
    config: PathBuf,

    /// Listen address, overriding `server.listen`
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    tracing::info!("Starting wsnotify-server v{}", env!("CARGO_PKG_VERSION"));

    let loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = loader.load().inspect_err(|e| {
        tracing::error!(path = ?args.config, error = %e, "Cannot load configuration");
    })?;
    let listen = loaded.server.listen;
    tracing::info!(path = ?args.config, "Configuration loaded");

    let (runtime_config, events_config) = loaded.into_parts();
    events_config
        .registry
        .ensure_kinds(SERVER_EMITTED_KINDS)
        .inspect_err(|e| tracing::error!(error = %e, "A topic the server publishes is disabled"))?;
    tracing::info!(
        topics = ?events_config.registry.topics().collect::<Vec<_>>(),
        subscriber_buffer = events_config.subscriber_buffer,
        "Topic registry initialized"
    );

    let state = AppState::new(runtime_config, events_config);

    let reload_stop = spawn_config_reload_handler(state.clone(), loader);
    let served = run_server(build_router(state.clone()), listen).await;
    reload_stop.notify_one();

    // Ends every open event stream.
    state.hub.close();
    if !state.tasks.is_empty() {
        tracing::warn!(
            live_tasks = state.tasks.len(),
            "Shutting down with tasks that never reported a terminal status"
        );
    }
    tracing::info!("Stopped");

    Ok(served?)
}

/// `RUST_LOG` wins over the built-in filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wsnotify_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

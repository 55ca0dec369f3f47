//! Unix signals: SIGTERM/SIGINT stop the server, SIGHUP reloads its config.

use crate::config::ConfigLoader;
use crate::config::runtime::RuntimeConfig;
use crate::state::AppState;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;
use wsnotify_sdk::objects::ServerConfigurationChangedEvent;

/// Resolves on the first SIGTERM or SIGINT.
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install shutdown signal handlers");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!(signal = "SIGTERM", "Shutting down");
        }
        _ = sigint.recv() => {
            tracing::info!(signal = "SIGINT", "Shutting down");
        }
    }
}

/// Reload the configuration on every SIGHUP until told to stop.
///
/// A successful reload is announced to every subscriber of the server
/// configuration topic. The `[events]` section is fixed at startup; changes
/// to it are reported and ignored until the next restart.
///
/// Notify the returned handle to end the reload task.
pub fn spawn_config_reload_handler(
    state: AppState,
    loader: Arc<ConfigLoader>,
) -> Arc<Notify> {
    let stop = Arc::new(Notify::new());
    let stopped = Arc::clone(&stop);

    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler, config reload disabled");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!(signal = "SIGHUP", "Reloading config");
                    match loader.reload() {
                        Ok(loaded_config) => {
                            let (runtime, events) = loaded_config.into_parts();
                            if events.registry != *state.publisher.registry() {
                                tracing::warn!("events.topics changed; restart to apply");
                            }
                            apply_reload(&state, runtime).await;
                            tracing::info!("Config reloaded");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Config reload failed, keeping the current config");
                        }
                    }
                }
                _ = stopped.notified() => {
                    tracing::debug!("Config reload task stopped");
                    break;
                }
            }
        }
    });

    stop
}

/// Swap in the reloaded configuration and announce the change.
pub async fn apply_reload(state: &AppState, runtime: RuntimeConfig) {
    {
        let current = state.config().await;
        if current.server.listen != runtime.server.listen {
            tracing::warn!(
                current = %current.server.listen,
                configured = %runtime.server.listen,
                "server.listen changed; restart to apply"
            );
        }
    }
    state.update_config(runtime).await;

    if let Err(e) = state
        .publisher
        .publish(ServerConfigurationChangedEvent::default())
    {
        tracing::error!(error = %e, "Failed to broadcast configuration change");
    }
}

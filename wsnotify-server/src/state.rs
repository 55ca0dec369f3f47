//! State shared by every handler and background task.

use crate::config::runtime::{EventsConfig, RuntimeConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use wsnotify_core::events::{Hub, Publisher};
use wsnotify_core::tasks::TaskCorrelation;

/// Publisher over the in-process hub.
pub type EventPublisher = Publisher<Arc<Hub>>;

/// Handles to the running server's shared components. Clones share them.
#[derive(Clone)]
pub struct AppState {
    /// Replaced wholesale on SIGHUP.
    pub config: Arc<RwLock<RuntimeConfig>>,
    /// Fan-out transport that WebSocket connections subscribe to.
    pub hub: Arc<Hub>,
    /// Every event leaves the server through this publisher.
    pub publisher: Arc<EventPublisher>,
    /// Owners of the tasks currently reporting status.
    pub tasks: Arc<TaskCorrelation>,
}

impl AppState {
    /// Create the state, wiring a fresh hub to a publisher over `events.registry`.
    pub fn new(config: RuntimeConfig, events: EventsConfig) -> Self {
        let hub = Arc::new(Hub::new(events.subscriber_buffer));
        let publisher = Publisher::new(Arc::new(events.registry), Arc::clone(&hub));
        Self {
            config: Arc::new(RwLock::new(config)),
            hub,
            publisher: Arc::new(publisher),
            tasks: Arc::new(TaskCorrelation::new()),
        }
    }

    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, RuntimeConfig> {
        self.config.read().await
    }

    pub async fn update_config(&self, runtime: RuntimeConfig) {
        *self.config.write().await = runtime;
    }
}

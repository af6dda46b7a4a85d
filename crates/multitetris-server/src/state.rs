use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::oneshot;

use multitetris_core::lobby::LobbySummary;
use multitetris_core::player::NetworkId;

use crate::config::ServerConfig;
use crate::hub::{Hub, HubCommand, HubSender, HubStats, spawn_hub};

#[derive(Clone)]
pub struct AppState {
    pub hub: HubSender,
    pub ws_connection_count: Arc<AtomicUsize>,
    next_network_id: Arc<AtomicU64>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state and start the hub task. Must be called inside a tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        let hub = spawn_hub(Hub::new(&config.lobbies));
        Self {
            hub,
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            next_network_id: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    /// Network ids start at 1 and are never reused within a process.
    pub fn allocate_network_id(&self) -> NetworkId {
        self.next_network_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Ask the hub for the current directory. `None` if the hub has stopped.
    pub async fn lobbies(&self) -> Option<Vec<LobbySummary>> {
        let (reply, rx) = oneshot::channel();
        self.hub.send(HubCommand::ListLobbies { reply }).ok()?;
        rx.await.ok()
    }

    pub async fn hub_stats(&self) -> Option<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.hub.send(HubCommand::Stats { reply }).ok()?;
        rx.await.ok()
    }
}

/// Counts a live WebSocket connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

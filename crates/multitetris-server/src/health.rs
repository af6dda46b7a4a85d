use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    pub lobbies: LobbyInfo,
}

#[derive(Serialize)]
pub struct LobbyInfo {
    pub active: usize,
    pub players: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ws_connection_count.load(Ordering::Relaxed);
    let (status, lobbies) = match state.hub_stats().await {
        Some(stats) => (
            "healthy",
            LobbyInfo {
                active: stats.lobbies,
                players: stats.lobby_members,
            },
        ),
        None => (
            "degraded",
            LobbyInfo {
                active: 0,
                players: 0,
            },
        ),
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        connections,
        lobbies,
    })
}

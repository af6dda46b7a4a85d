use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;

use multitetris_core::lobby::{LobbyId, LobbySummary};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LobbiesResponse {
    pub lobbies: Vec<LobbySummary>,
}

async fn fetch_lobbies(state: &AppState) -> Result<Vec<LobbySummary>, AppError> {
    state
        .lobbies()
        .await
        .ok_or_else(|| AppError::Unavailable("lobby hub is not running".to_string()))
}

/// GET /api/v1/lobbies
pub async fn list_lobbies(State(state): State<AppState>) -> Result<Json<LobbiesResponse>, AppError> {
    let lobbies = fetch_lobbies(&state).await?;
    Ok(Json(LobbiesResponse { lobbies }))
}

/// GET /api/v1/lobbies/{lobby_id}
pub async fn get_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<LobbySummary>, AppError> {
    fetch_lobbies(&state)
        .await?
        .into_iter()
        .find(|l| l.id == lobby_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("lobby {lobby_id} not found")))
}

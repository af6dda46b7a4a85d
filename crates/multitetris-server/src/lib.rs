pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod health;
pub mod hub;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
/// Spawns the hub task, so this must run inside a tokio runtime.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let api_routes = Router::new()
        .route("/lobbies", get(api::list_lobbies))
        .route("/lobbies/{lobby_id}", get(api::get_lobby))
        .layer(CorsLayer::permissive());

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .with_state(state.clone());

    (app, state)
}

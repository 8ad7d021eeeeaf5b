// Public API for integration tests and potential library usage

pub mod api;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod presenter;
pub mod protocol;
pub mod questions;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// HTTP + WebSocket routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/channels", get(api::list_active_channels))
        .route(
            "/api/channels/{channel}/session",
            get(api::get_channel_session),
        )
        .route("/api/leaderboard", get(api::get_leaderboard))
        .route("/api/players/{voter}/stats", get(api::get_player_stats))
        .route("/api/players/{voter}/sessions", get(api::get_player_sessions))
        .route("/api/themes", get(api::list_themes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

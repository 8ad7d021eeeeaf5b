//! HTTP API endpoints for read-only queries.
//!
//! Live session state plus the persisted leaderboard and player history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Theme name with how many matchups it holds
#[derive(Debug, Clone, Serialize)]
pub struct ThemeInfo {
    pub theme: String,
    pub matchups: usize,
}

fn store_failure(e: impl std::fmt::Display) -> Response {
    tracing::error!("Stats query failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Stats store unavailable").into_response()
}

/// Channels that currently hold a session.
///
/// GET /api/channels
pub async fn list_active_channels(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.active_channels().await)
}

/// Live session in a channel.
///
/// GET /api/channels/{channel}/session
pub async fn get_channel_session(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
) -> Response {
    match state.registry.get(&channel).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, "No active session").into_response(),
    }
}

/// GET /api/leaderboard?limit=
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Response {
    match state.store.get_leaderboard(query.limit()).await {
        Ok(board) => Json(board).into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /api/players/{voter}/stats
pub async fn get_player_stats(
    State(state): State<Arc<AppState>>,
    Path(voter): Path<String>,
) -> Response {
    match state.store.get_lifetime_stats(&voter).await {
        Ok(Some(stats)) => Json(stats).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Unknown player").into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /api/players/{voter}/sessions?limit=
pub async fn get_player_sessions(
    State(state): State<Arc<AppState>>,
    Path(voter): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    match state.store.get_recent_sessions(&voter, query.limit()).await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /api/themes
pub async fn list_themes(State(state): State<Arc<AppState>>) -> Json<Vec<ThemeInfo>> {
    let themes = state
        .registry
        .library()
        .themes()
        .into_iter()
        .map(|(theme, matchups)| ThemeInfo { theme, matchups })
        .collect();
    Json(themes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(LimitQuery { limit: None }.limit(), DEFAULT_LIMIT);
        assert_eq!(LimitQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(LimitQuery { limit: Some(5000) }.limit(), MAX_LIMIT);
        assert_eq!(LimitQuery { limit: Some(7) }.limit(), 7);
    }
}

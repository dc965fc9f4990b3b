//! /, /status handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::{ApiError, ApiState};

pub async fn handle_root() -> &'static str {
    "Waymark API"
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub origin_network: String,
    pub cached_clients: usize,
    pub index_hints: u64,
    pub discovered_content: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiError> {
    let index_hints = state
        .index
        .count()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(StatusResponse {
        origin_network: state.tokens.origin().to_hex(),
        cached_clients: state.pool.len(),
        index_hints,
        discovered_content: state.discovered.len(),
    }))
}

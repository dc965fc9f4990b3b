//! /token/{id}, /erc721/{collection}/{token_number} handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

use waymark_core::format::{render, Standard};
use waymark_core::TokenInfo;

use super::{not_found, parse_token_id, resolve_failure, ApiError, ApiState};

// ── /token/{id} ───────────────────────────────────────────────────────────────

pub async fn handle_token(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<TokenInfo>, ApiError> {
    let id = parse_token_id(&id)?;
    state
        .tokens
        .resolve(&id)
        .await
        .map_err(resolve_failure)?
        .map(Json)
        .ok_or_else(not_found)
}

// ── /erc721/{collection}/{token_number} ───────────────────────────────────────

pub async fn handle_erc721(
    State(state): State<ApiState>,
    Path((collection, token_number)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let info = state
        .tokens
        .resolve_by_collection(&collection, token_number)
        .await
        .map_err(resolve_failure)?
        .ok_or_else(not_found)?;

    tracing::debug!(collection = %collection, token_number, location = %info.location.short(), "erc721 lookup served");
    Ok(Json(render(&info.metadata, Standard::Erc721, false)))
}

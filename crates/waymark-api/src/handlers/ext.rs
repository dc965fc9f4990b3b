//! /ext/{*uri} handler: metadata by extending-metadata URI.
//!
//! The path may carry a standard prefix (`erc721/`, `erc1155/full/`, ...)
//! before the URI. When no token claims the URI, the URI itself is served
//! as content.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use waymark_core::format::{render, Standard};

use super::content::content_response;
use super::{content_failure, resolve_failure, ApiError, ApiState};

/// Longer prefixes first so `erc721/full/` wins over `erc721/`.
const PREFIXES: [(&str, Standard, bool); 6] = [
    ("erc721/full/", Standard::Erc721, true),
    ("erc1155/full/", Standard::Erc1155, true),
    ("erc721/", Standard::Erc721, false),
    ("erc1155/", Standard::Erc1155, false),
    ("yours/", Standard::Native, true),
    ("full/", Standard::Unspecified, true),
];

/// Split a request path into (standard, full, uri).
pub fn parse_standard_and_uri(path: &str) -> (Standard, bool, &str) {
    PREFIXES
        .iter()
        .find_map(|(prefix, standard, full)| {
            path.strip_prefix(prefix).map(|uri| (*standard, *full, uri))
        })
        .unwrap_or((Standard::Unspecified, false, path))
}

pub async fn handle_ext(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let (standard, full, uri) = parse_standard_and_uri(&raw);

    if let Some(info) = state.tokens.resolve_by_uri(uri).await.map_err(resolve_failure)? {
        return Ok(Json(render(&info.metadata, standard, full)).into_response());
    }

    tracing::debug!(uri, "no token claims uri, serving as content");
    let descriptor = state
        .content
        .resolve(uri, false)
        .await
        .map_err(content_failure)?;
    Ok(content_response(descriptor))
}

//! HTTP API handlers for token metadata and off-chain content.

pub mod content;
pub mod ext;
pub mod metadata;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;

use waymark_core::TokenId;
use waymark_services::{
    ClientPool, ContentError, ContentResolver, DiscoveredContent, IndexStore, ResolveError,
    TokenResolver,
};

#[derive(Clone)]
pub struct ApiState {
    pub tokens: Arc<TokenResolver>,
    pub content: Arc<ContentResolver>,
    /// Shared with `tokens`; read here for status reporting only.
    pub pool: Arc<ClientPool>,
    pub index: IndexStore,
    pub discovered: DiscoveredContent,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub(crate) const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000";

pub type ApiError = (StatusCode, String);

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Not Found".to_string())
}

fn parse_token_id(hex_str: &str) -> Result<TokenId, ApiError> {
    TokenId::from_hex(hex_str).map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid token id: {e}")))
}

fn resolve_failure(e: ResolveError) -> ApiError {
    tracing::error!(error = %e, "token resolution failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn content_failure(e: ContentError) -> ApiError {
    match e {
        ContentError::InvalidUri(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            tracing::error!(error = %other, "content resolution failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

pub use content::handle_ipfs;
pub use ext::handle_ext;
pub use metadata::{handle_erc721, handle_token};
pub use status::{handle_root, handle_status};

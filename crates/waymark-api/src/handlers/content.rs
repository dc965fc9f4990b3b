//! /ipfs/{*path} handler and the descriptor → response mapping shared with /ext.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use waymark_services::{ContentDescriptor, Payload};

use super::{content_failure, ApiError, ApiState, CACHE_CONTROL_IMMUTABLE};

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    #[serde(default)]
    pub stream: bool,
}

pub async fn handle_ipfs(
    State(state): State<ApiState>,
    Path(path): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<Response, ApiError> {
    let descriptor = state
        .content
        .resolve(&path, query.stream)
        .await
        .map_err(content_failure)?;
    Ok(content_response(descriptor))
}

/// JSON payloads and listings as JSON, everything else as a cacheable
/// binary body.
pub fn content_response(descriptor: ContentDescriptor) -> Response {
    let ContentDescriptor {
        mime_type,
        length,
        payload,
        ..
    } = descriptor;

    match payload {
        Payload::Json(doc) => Json(doc).into_response(),
        Payload::Directory(listing) => Json(listing.to_json()).into_response(),
        Payload::Bytes(bytes) => {
            let length = Some(bytes.len() as u64);
            binary_response(&mime_type, length, Body::from(bytes))
        }
        Payload::Stream(stream) => binary_response(&mime_type, length, Body::from_stream(stream)),
    }
}

fn binary_response(mime_type: &str, length: Option<u64>, body: Body) -> Response {
    let mut builder = Response::builder()
        .header(CONTENT_TYPE, mime_type)
        .header(CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE);
    if let Some(length) = length {
        builder = builder.header(CONTENT_LENGTH, length);
    }
    builder
        .body(body)
        .unwrap_or_else(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response())
}

//! Token metadata commands: token, erc721, ext.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use super::content::print_body;
use super::http::{base_url, encode_segment, get_bytes, get_json};

#[derive(Deserialize)]
struct TokenResponse {
    location: String,
    metadata: Value,
}

pub async fn cmd_token(port: u16, id: &str) -> Result<()> {
    let resp: TokenResponse = get_json(&format!("{}/token/{}", base_url(port), id)).await?;

    let name = resp.metadata["name"].as_str().unwrap_or("<unnamed>");
    println!("  ┌─ {}", name);
    println!("  └─ location : {}", resp.location);
    println!();
    println!("{}", serde_json::to_string_pretty(&resp.metadata)?);
    Ok(())
}

pub async fn cmd_erc721(port: u16, collection: &str, token_number: u64) -> Result<()> {
    let url = format!(
        "{}/erc721/{}/{}",
        base_url(port),
        encode_segment(collection),
        token_number
    );
    let resp: Value = get_json(&url).await?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

/// `prefix` is an optional standard prefix such as `erc721/full`.
pub async fn cmd_ext(port: u16, prefix: Option<&str>, uri: &str) -> Result<()> {
    let path = match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_matches('/'), encode_segment(uri)),
        None => encode_segment(uri),
    };
    let (content_type, body) = get_bytes(&format!("{}/ext/{}", base_url(port), path)).await?;
    print_body(content_type.as_deref(), &body, None)
}

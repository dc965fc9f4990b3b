//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    origin_network: String,
    cached_clients: usize,
    index_hints: u64,
    discovered_content: usize,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Waymark Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Origin network     : {}", resp.origin_network);
    println!("  Cached clients     : {}", resp.cached_clients);
    println!("  Location hints     : {}", resp.index_hints);
    println!("  Discovered content : {}", resp.discovered_content);

    Ok(())
}

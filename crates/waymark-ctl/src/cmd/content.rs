//! Content command: fetch an addressed object through the daemon.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::http::{base_url, get_bytes};

pub async fn cmd_ipfs(port: u16, path: &str, out: Option<&Path>) -> Result<()> {
    let path = path
        .trim_start_matches("ipfs://")
        .trim_start_matches("/ipfs/");
    let (content_type, body) = get_bytes(&format!("{}/ipfs/{}", base_url(port), path)).await?;
    print_body(content_type.as_deref(), &body, out)
}

/// Pretty-print JSON bodies; write anything else to `out`, or summarize it.
pub fn print_body(content_type: Option<&str>, body: &[u8], out: Option<&Path>) -> Result<()> {
    if let Some(out) = out {
        std::fs::write(out, body).with_context(|| format!("failed to write {}", out.display()))?;
        println!("Wrote {} bytes to {}", body.len(), out.display());
        return Ok(());
    }

    let is_json = content_type.is_some_and(|t| t.starts_with("application/json"));
    if is_json {
        if let Ok(doc) = serde_json::from_slice::<Value>(body) {
            println!("{}", serde_json::to_string_pretty(&doc)?);
            return Ok(());
        }
    }

    println!(
        "{} bytes of {} (use --out <file> to save)",
        body.len(),
        content_type.unwrap_or("application/octet-stream")
    );
    Ok(())
}

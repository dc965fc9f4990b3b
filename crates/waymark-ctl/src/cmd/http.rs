//! Shared HTTP request helpers for CLI commands.

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// Everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

async fn send(url: &str) -> Result<reqwest::Response> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to waymarkd at {} — is it running?", url))?;
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        bail!("{} answered {}: {}", url, status, message);
    }
    Ok(resp)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    send(url)
        .await?
        .json::<T>()
        .await
        .context("failed to parse response")
}

/// Raw body plus its declared content type.
pub async fn get_bytes(url: &str) -> Result<(Option<String>, Vec<u8>)> {
    let resp = send(url).await?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.bytes().await.context("failed to read response body")?;
    Ok((content_type, body.to_vec()))
}

/// Percent-encode a URI so it travels as a single path segment.
pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

//! Primary content-addressed store capability and its node-RPC client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Url;
use serde::Deserialize;

use crate::content_types::{ByteStream, DirectoryEntry, ObjectStat, ObjectType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("content store unreachable: {0}")]
    Unreachable(String),
    #[error("content store rejected {path}: {message}")]
    Rejected { path: String, message: String },
    #[error("undecodable content store response: {0}")]
    Decode(String),
    #[error("content store timed out after {0:?}")]
    Timeout(Duration),
}

/// Node API of a content-addressed store. Paths are `root[/sub/path]`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn stat(&self, path: &str) -> Result<ObjectStat, StoreError>;

    /// Immediate children only.
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError>;

    async fn cat(&self, path: &str) -> Result<Bytes, StoreError>;

    async fn cat_stream(&self, path: &str) -> Result<ByteStream, StoreError>;
}

// ── Node RPC implementation ───────────────────────────────────────────────────

/// Talks to a store node's `/api/v0` RPC endpoints.
pub struct RpcContentStore {
    http: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatResponse {
    hash: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    cumulative_size: u64,
    #[serde(rename = "Type")]
    object_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsResponse {
    #[serde(default)]
    objects: Vec<LsObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsObject {
    #[serde(default)]
    links: Vec<LsLink>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsLink {
    name: String,
    hash: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "Type", default)]
    link_type: u8,
}

/// Unixfs node types that are directories (plain and sharded).
fn is_directory_link(link_type: u8) -> bool {
    matches!(link_type, 1 | 5)
}

impl RpcContentStore {
    pub fn new(node_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base: node_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, command: &str, arg: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/api/v0/{command}", self.base))
            .map_err(|e| StoreError::Unreachable(format!("bad node url: {e}")))?;
        url.query_pairs_mut().append_pair("arg", arg);
        Ok(url)
    }

    async fn call(&self, command: &str, arg: &str) -> Result<reqwest::Response, StoreError> {
        let resp = self
            .http
            .post(self.endpoint(command, arg)?)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        if status.is_server_error() && !message.contains("no link named") {
            return Err(StoreError::Unreachable(format!("{status}: {message}")));
        }
        Err(StoreError::Rejected {
            path: arg.to_string(),
            message: format!("{status}: {message}"),
        })
    }
}

#[async_trait]
impl ContentStore for RpcContentStore {
    async fn stat(&self, path: &str) -> Result<ObjectStat, StoreError> {
        let stat: StatResponse = self
            .call("files/stat", &format!("/ipfs/{path}"))
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let object_type = if stat.object_type == "directory" {
            ObjectType::Directory
        } else {
            ObjectType::File
        };
        let size = match object_type {
            ObjectType::File => stat.size,
            ObjectType::Directory => stat.cumulative_size,
        };
        Ok(ObjectStat {
            cid: stat.hash,
            size,
            object_type,
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        let listing: LsResponse = self
            .call("ls", path)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(listing
            .objects
            .into_iter()
            .flat_map(|o| o.links)
            .map(|link| DirectoryEntry {
                name: link.name,
                entry_type: if is_directory_link(link.link_type) {
                    ObjectType::Directory
                } else {
                    ObjectType::File
                },
                size: link.size,
                cid: link.hash,
            })
            .collect())
    }

    async fn cat(&self, path: &str) -> Result<Bytes, StoreError> {
        self.call("cat", path)
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }

    async fn cat_stream(&self, path: &str) -> Result<ByteStream, StoreError> {
        let resp = self.call("cat", path).await?;
        Ok(Box::pin(resp.bytes_stream().map_err(std::io::Error::other)))
    }
}

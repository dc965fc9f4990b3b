//! In-memory implementations of the capability traits.
//!
//! Used by unit tests here and by the integration crate. Everything is
//! scripted up front and every call is counted, so tests can assert on
//! how many remote round-trips a flow took.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use waymark_core::{
    FormatTag, MetadataRecord, NetworkRef, QueryError, TokenId, TokenSection, TokenTarget,
};

use crate::content_store::{ContentStore, StoreError};
use crate::content_types::{ByteStream, DirectoryEntry, ObjectStat, ObjectType};
use crate::fetcher::{FetchBody, FetchError, FetchedResponse, Fetcher};
use crate::ledger::{NetworkClient, NetworkConnector};
use crate::queries::{ACTIVE_METADATA, TARGET_BY_COLLECTION, TARGET_BY_URI, TRANSFER_HISTORY};

/// A minimal ERC721-capable record issued on `issuing`.
pub fn sample_record(name: &str, issuing: &NetworkRef) -> MetadataRecord {
    let mut properties = Map::new();
    properties.insert(
        "erc721".into(),
        json!({ "description": format!("{name} description"), "image": "ipfs://QmSampleImage/1.png" }),
    );
    MetadataRecord {
        name: name.to_string(),
        properties,
        token: TokenSection {
            issuing_chain: issuing.clone(),
            decimals: 0,
            modules: vec![FormatTag::Erc721],
            kind: "unique".into(),
            blockchains: vec![issuing.clone()],
        },
    }
}

// ── Ledger ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct LedgerState {
    records: DashMap<(NetworkRef, TokenId), Value>,
    redirects: DashMap<(NetworkRef, TokenId), NetworkRef>,
    uri_targets: DashMap<String, TokenTarget>,
    collection_targets: DashMap<(String, u64), TokenTarget>,
    failures: DashMap<NetworkRef, u32>,
    refusals: DashMap<NetworkRef, u32>,
    connects: DashMap<NetworkRef, usize>,
    log: Mutex<Vec<(NetworkRef, String)>>,
}

/// Scripted set of ledger networks. Acts as the connector; clients it hands
/// out share its state.
#[derive(Clone, Default)]
pub struct ScriptedLedger {
    state: Arc<LedgerState>,
}

/// Consume one scripted failure for `network`, if any remain.
fn take_one(counters: &DashMap<NetworkRef, u32>, network: &NetworkRef) -> bool {
    match counters.get_mut(network) {
        Some(mut left) if *left > 0 => {
            *left -= 1;
            true
        }
        _ => false,
    }
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, network: &NetworkRef, token: &TokenId, record: MetadataRecord) {
        let value = serde_json::to_value(record).unwrap_or_default();
        self.add_raw_record(network, token, value);
    }

    /// Serve `value` verbatim as the metadata of `token` on `network`.
    pub fn add_raw_record(&self, network: &NetworkRef, token: &TokenId, value: Value) {
        self.state
            .records
            .insert((network.clone(), token.clone()), value);
    }

    /// `from` reports that `token` most recently moved to `to`.
    pub fn add_redirect(&self, from: &NetworkRef, token: &TokenId, to: &NetworkRef) {
        self.state
            .redirects
            .insert((from.clone(), token.clone()), to.clone());
    }

    pub fn add_uri_target(&self, uri: &str, target: TokenTarget) {
        self.state.uri_targets.insert(uri.to_string(), target);
    }

    pub fn add_collection_target(&self, collection: &str, token_number: u64, target: TokenTarget) {
        self.state
            .collection_targets
            .insert((collection.to_string(), token_number), target);
    }

    /// The next `n` queries against `network` fail with a transport error.
    pub fn fail_next(&self, network: &NetworkRef, n: u32) {
        self.state.failures.insert(network.clone(), n);
    }

    /// The next `n` connection attempts to `network` fail.
    pub fn refuse_connections(&self, network: &NetworkRef, n: u32) {
        self.state.refusals.insert(network.clone(), n);
    }

    /// Connection attempts made to `network`, refused ones included.
    pub fn connects(&self, network: &NetworkRef) -> usize {
        self.state.connects.get(network).map(|n| *n).unwrap_or(0)
    }

    pub fn query_count(&self) -> usize {
        self.queries().len()
    }

    /// Every query issued so far, in order.
    pub fn queries(&self) -> Vec<(NetworkRef, String)> {
        self.state
            .log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NetworkConnector for ScriptedLedger {
    async fn connect(&self, network: &NetworkRef) -> Result<Arc<dyn NetworkClient>, QueryError> {
        *self.state.connects.entry(network.clone()).or_insert(0) += 1;
        if take_one(&self.state.refusals, network) {
            return Err(QueryError::transport(network, "connection refused"));
        }
        Ok(Arc::new(ScriptedClient {
            network: network.clone(),
            state: self.state.clone(),
        }))
    }
}

struct ScriptedClient {
    network: NetworkRef,
    state: Arc<LedgerState>,
}

impl ScriptedClient {
    fn rejected(&self, query: &str, message: &str) -> QueryError {
        QueryError::Rejected {
            network: self.network.clone(),
            query: query.to_string(),
            message: message.to_string(),
        }
    }

    fn token_arg(&self, query: &str, args: &Value) -> Result<TokenId, QueryError> {
        args.get("id")
            .and_then(Value::as_str)
            .and_then(|id| TokenId::from_hex(id).ok())
            .ok_or_else(|| self.rejected(query, "missing or malformed id"))
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    async fn query(&self, name: &str, args: &Value) -> Result<Option<Value>, QueryError> {
        self.state
            .log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.network.clone(), name.to_string()));

        if take_one(&self.state.failures, &self.network) {
            return Err(QueryError::transport(&self.network, "scripted failure"));
        }

        match name {
            ACTIVE_METADATA => {
                let key = (self.network.clone(), self.token_arg(name, args)?);
                Ok(self.state.records.get(&key).map(|v| v.value().clone()))
            }
            TRANSFER_HISTORY => {
                let key = (self.network.clone(), self.token_arg(name, args)?);
                let data: Vec<Value> = self
                    .state
                    .redirects
                    .get(&key)
                    .map(|to| vec![json!({ "blockchain_rid": to.to_hex() })])
                    .unwrap_or_default();
                Ok(Some(json!({ "data": data })))
            }
            TARGET_BY_URI => {
                let uri = args
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| self.rejected(name, "missing uri"))?;
                Ok(self
                    .state
                    .uri_targets
                    .get(uri)
                    .and_then(|t| serde_json::to_value(t.value()).ok()))
            }
            TARGET_BY_COLLECTION => {
                let collection = args.get("collection").and_then(Value::as_str);
                let number = args.get("token_id").and_then(Value::as_u64);
                let (Some(collection), Some(number)) = (collection, number) else {
                    return Err(self.rejected(name, "missing collection or token_id"));
                };
                Ok(self
                    .state
                    .collection_targets
                    .get(&(collection.to_string(), number))
                    .and_then(|t| serde_json::to_value(t.value()).ok()))
            }
            other => Err(self.rejected(other, "unknown query")),
        }
    }
}

// ── Content store ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    files: DashMap<String, Bytes>,
    directories: DashMap<String, Vec<DirectoryEntry>>,
    unreachable: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

/// Content store over in-memory files and directories keyed by `root[/path]`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, body: impl Into<Bytes>) {
        self.state.files.insert(path.to_string(), body.into());
    }

    pub fn add_directory(&self, path: &str, entries: Vec<DirectoryEntry>) {
        self.state.directories.insert(path.to_string(), entries);
    }

    /// While set, every call fails as if the node were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay applied before answering each call.
    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("memory store offline".into()));
        }
        Ok(())
    }

    fn file(&self, path: &str) -> Result<Bytes, StoreError> {
        self.state
            .files
            .get(path)
            .map(|b| b.value().clone())
            .ok_or_else(|| StoreError::Rejected {
                path: path.to_string(),
                message: "no such file".into(),
            })
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn stat(&self, path: &str) -> Result<ObjectStat, StoreError> {
        self.enter().await?;
        if let Some(body) = self.state.files.get(path) {
            return Ok(ObjectStat {
                cid: format!("cid:{path}"),
                size: body.len() as u64,
                object_type: ObjectType::File,
            });
        }
        if let Some(entries) = self.state.directories.get(path) {
            return Ok(ObjectStat {
                cid: format!("cid:{path}"),
                size: entries.iter().map(|e| e.size).sum(),
                object_type: ObjectType::Directory,
            });
        }
        Err(StoreError::Rejected {
            path: path.to_string(),
            message: "not found".into(),
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        self.enter().await?;
        self.state
            .directories
            .get(path)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::Rejected {
                path: path.to_string(),
                message: "not a directory".into(),
            })
    }

    async fn cat(&self, path: &str) -> Result<Bytes, StoreError> {
        self.enter().await?;
        self.file(path)
    }

    async fn cat_stream(&self, path: &str) -> Result<ByteStream, StoreError> {
        self.enter().await?;
        let body = self.file(path)?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(body)])))
    }
}

// ── HTTP fetcher ──────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Scripted {
    Respond { content_type: String, body: Bytes },
    Stall { content_type: String },
    Fail,
}

/// Fetcher answering from a URL table. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, content_type: &str, body: impl Into<Bytes>) {
        self.script(
            url,
            Scripted::Respond {
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
    }

    /// Requests to `url` get headers, then a body that never arrives.
    pub fn stall(&self, url: &str, content_type: &str) {
        self.script(
            url,
            Scripted::Stall {
                content_type: content_type.to_string(),
            },
        );
    }

    /// Requests to `url` fail at the connection level.
    pub fn fail(&self, url: &str) {
        self.script(url, Scripted::Fail);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn script(&self, url: &str, outcome: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), outcome);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, url: &str, streaming: bool) -> Result<FetchedResponse, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let outcome = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned();

        match outcome {
            Some(Scripted::Respond { content_type, body }) => {
                let length = Some(body.len() as u64);
                let body = if streaming {
                    FetchBody::Streaming(Box::pin(futures::stream::iter(vec![Ok(body)])))
                } else {
                    FetchBody::Buffered(body)
                };
                Ok(FetchedResponse {
                    content_type: Some(content_type),
                    length,
                    body,
                })
            }
            Some(Scripted::Stall { content_type }) => Ok(FetchedResponse {
                content_type: Some(content_type),
                length: None,
                body: FetchBody::Streaming(Box::pin(futures::stream::pending())),
            }),
            Some(Scripted::Fail) => Err(FetchError::Request {
                url: url.to_string(),
                message: "connection refused".into(),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

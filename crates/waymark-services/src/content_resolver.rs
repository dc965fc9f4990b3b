//! Off-chain content resolution.
//!
//! http(s) URIs are fetched once and classified by their declared type.
//! Content-addressed references go to the primary store first and, only if
//! that attempt fails, to the public gateway with a longer timeout. Files
//! are classified by image extension, then by a speculative JSON parse,
//! and otherwise returned as opaque bytes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use serde_json::Value;

use crate::content_store::{ContentStore, StoreError};
use crate::content_types::{
    ByteStream, ContentDescriptor, ContentKind, ContentSource, DirectoryListing, ObjectInfo,
    ObjectType, Payload, MIME_BINARY, MIME_JSON,
};
use crate::content_uri::{image_mime, AddressedPath, ContentUri};
use crate::discovered::DiscoveredContent;
use crate::fetcher::{FetchBody, FetchError, FetchedResponse, Fetcher};

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io";
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("invalid content uri: {0:?}")]
    InvalidUri(String),
    #[error(transparent)]
    Http(#[from] FetchError),
    #[error("content unavailable (primary store: {primary}; gateway: {fallback})")]
    Unavailable {
        primary: StoreError,
        fallback: FetchError,
    },
}

pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn Fetcher>,
    discovered: DiscoveredContent,
    gateway_url: String,
    primary_timeout: Duration,
    gateway_timeout: Duration,
}

async fn collect(mut stream: ByteStream) -> Result<Bytes, std::io::Error> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.try_next().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

async fn with_timeout<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_elapsed: impl FnOnce() -> E,
) -> Result<T, E> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(on_elapsed()))
}

impl ContentResolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn Fetcher>,
        discovered: DiscoveredContent,
    ) -> Self {
        Self {
            store,
            fetcher,
            discovered,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            primary_timeout: DEFAULT_PRIMARY_TIMEOUT,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    pub fn with_gateway(mut self, url: impl Into<String>, timeout: Duration) -> Self {
        self.gateway_url = url.into().trim_end_matches('/').to_string();
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = timeout;
        self
    }

    pub fn discovered(&self) -> &DiscoveredContent {
        &self.discovered
    }

    /// Resolve `uri` to a typed payload. `streaming` asks for an unbuffered
    /// body where classification allows it.
    pub async fn resolve(&self, uri: &str, streaming: bool) -> Result<ContentDescriptor, ContentError> {
        match ContentUri::parse(uri) {
            None => Err(ContentError::InvalidUri(uri.to_string())),
            Some(ContentUri::Http(url)) => self.from_http(&url, streaming).await,
            Some(ContentUri::Addressed(path)) => self.from_store(&path, streaming).await,
        }
    }

    async fn from_store(
        &self,
        path: &AddressedPath,
        streaming: bool,
    ) -> Result<ContentDescriptor, ContentError> {
        let primary = with_timeout(
            self.primary_timeout,
            self.from_primary(path, streaming),
            || StoreError::Timeout(self.primary_timeout),
        )
        .await;

        let primary_err = match primary {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) => e,
        };
        tracing::warn!(path = %path.target(), error = %primary_err, "primary store failed, falling back to gateway");

        self.from_gateway(path)
            .await
            .map_err(|fallback| ContentError::Unavailable {
                primary: primary_err,
                fallback,
            })
    }

    async fn from_primary(
        &self,
        path: &AddressedPath,
        streaming: bool,
    ) -> Result<ContentDescriptor, StoreError> {
        let target = path.target();
        let stat = self.store.stat(&target).await?;
        let object = ObjectInfo {
            stat: stat.clone(),
            path: path.display_path(),
        };

        if stat.object_type == ObjectType::Directory {
            let files = self.store.list(&target).await?;
            tracing::debug!(path = %target, entries = files.len(), "listed directory");
            return Ok(ContentDescriptor {
                mime_type: MIME_JSON.to_string(),
                length: None,
                payload: Payload::Directory(DirectoryListing {
                    path: path.display_path(),
                    files,
                }),
                source: ContentSource::Primary,
                object: Some(object),
            });
        }

        if streaming {
            if let Some(mime) = image_mime(&target) {
                let stream = self.store.cat_stream(&target).await?;
                return Ok(ContentDescriptor {
                    mime_type: mime.to_string(),
                    length: Some(stat.size),
                    payload: Payload::Stream(stream),
                    source: ContentSource::Primary,
                    object: Some(object),
                });
            }
        }

        let body = self.store.cat(&target).await?;
        Ok(self.classify_file(&target, body, ContentSource::Primary, Some(object)))
    }

    /// The gateway only ever yields file bodies. Directory listings come
    /// from the primary store; a gateway index page classifies as binary.
    async fn from_gateway(&self, path: &AddressedPath) -> Result<ContentDescriptor, FetchError> {
        let limit = self.gateway_timeout;
        with_timeout(limit, self.fetch_gateway(path), || FetchError::Timeout(limit)).await
    }

    async fn fetch_gateway(&self, path: &AddressedPath) -> Result<ContentDescriptor, FetchError> {
        let target = path.target();
        let url = format!("{}/ipfs/{}", self.gateway_url, target);
        let resp = self.fetcher.get(&url, false).await?;

        let body = match resp.body {
            FetchBody::Buffered(body) => body,
            FetchBody::Streaming(stream) => collect(stream).await.map_err(|e| FetchError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?,
        };
        tracing::info!(path = %target, bytes = body.len(), "served from gateway");
        let descriptor = self.classify_file(&target, body, ContentSource::Gateway, None);
        if descriptor.kind() == ContentKind::Binary {
            tracing::debug!(
                path = %target,
                "gateway body is opaque, directory listings need the primary store"
            );
        }
        Ok(descriptor)
    }

    /// Headers and any body that must be buffered share one deadline. A
    /// body handed back as a stream is the caller's to drive.
    async fn from_http(&self, url: &str, streaming: bool) -> Result<ContentDescriptor, ContentError> {
        let limit = self.gateway_timeout;
        let descriptor = with_timeout(limit, self.fetch_http(url, streaming), || {
            FetchError::Timeout(limit)
        })
        .await?;
        Ok(descriptor)
    }

    async fn fetch_http(&self, url: &str, streaming: bool) -> Result<ContentDescriptor, FetchError> {
        let resp = self.fetcher.get(url, streaming).await?;

        let declares_json = resp.declares_json();
        let FetchedResponse {
            content_type,
            length,
            body,
        } = resp;
        let mime_type = content_type.unwrap_or_else(|| MIME_BINARY.to_string());

        let body = match body {
            FetchBody::Streaming(stream) if !declares_json => {
                return Ok(ContentDescriptor {
                    mime_type,
                    length,
                    payload: Payload::Stream(stream),
                    source: ContentSource::Http,
                    object: None,
                });
            }
            FetchBody::Streaming(stream) => collect(stream).await.map_err(|e| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?,
            FetchBody::Buffered(body) => body,
        };

        let length = Some(body.len() as u64);
        let payload = if declares_json {
            match serde_json::from_slice::<Value>(&body) {
                Ok(doc) => Payload::Json(doc),
                Err(e) => {
                    tracing::debug!(url, error = %e, "declared json did not parse, serving bytes");
                    Payload::Bytes(body)
                }
            }
        } else {
            Payload::Bytes(body)
        };

        Ok(ContentDescriptor {
            mime_type,
            length,
            payload,
            source: ContentSource::Http,
            object: None,
        })
    }

    /// Shared by the primary and gateway paths so both classify identically.
    fn classify_file(
        &self,
        target: &str,
        body: Bytes,
        source: ContentSource,
        object: Option<ObjectInfo>,
    ) -> ContentDescriptor {
        let length = Some(body.len() as u64);

        let (mime_type, payload) = if let Some(mime) = image_mime(target) {
            (mime, Payload::Bytes(body))
        } else {
            match serde_json::from_slice::<Value>(&body) {
                Ok(doc) => {
                    self.discovered.record_from_metadata(&doc);
                    (MIME_JSON, Payload::Json(doc))
                }
                Err(_) => (MIME_BINARY, Payload::Bytes(body)),
            }
        };

        ContentDescriptor {
            mime_type: mime_type.to_string(),
            length,
            payload,
            source,
            object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_types::DirectoryEntry;
    use crate::testing::{MemoryStore, ScriptedFetcher};
    use serde_json::json;

    const GATEWAY: &str = "https://gw.test";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-body";

    fn resolver(store: &MemoryStore, fetcher: &ScriptedFetcher) -> ContentResolver {
        ContentResolver::new(
            Arc::new(store.clone()),
            Arc::new(fetcher.clone()),
            DiscoveredContent::new(),
        )
        .with_gateway(GATEWAY, Duration::from_secs(1))
        .with_primary_timeout(Duration::from_secs(1))
    }

    fn entry(name: &str, entry_type: ObjectType) -> DirectoryEntry {
        DirectoryEntry {
            name: name.into(),
            entry_type,
            size: 10,
            cid: format!("cid-{name}"),
        }
    }

    #[tokio::test]
    async fn png_is_identical_from_primary_and_gateway() {
        let store = MemoryStore::new();
        store.add_file("QmRoot/art/1.png", PNG);
        let fetcher = ScriptedFetcher::new();
        let primary = resolver(&store, &fetcher)
            .resolve("ipfs://QmRoot/art/1.png", false)
            .await
            .unwrap();

        let down = MemoryStore::new();
        down.set_unreachable(true);
        fetcher.respond(&format!("{GATEWAY}/ipfs/QmRoot/art/1.png"), "image/png", PNG);
        let fallback = resolver(&down, &fetcher)
            .resolve("ipfs://QmRoot/art/1.png", false)
            .await
            .unwrap();

        assert_eq!(primary.mime_type, "image/png");
        assert_eq!(fallback.mime_type, "image/png");
        assert_eq!(primary.source, ContentSource::Primary);
        assert_eq!(fallback.source, ContentSource::Gateway);
        assert_eq!(primary.bytes(), fallback.bytes());
        assert_eq!(primary.bytes().unwrap().as_ref(), PNG);
    }

    #[tokio::test]
    async fn directory_lists_immediate_children() {
        let store = MemoryStore::new();
        store.add_directory(
            "QmDir",
            vec![
                entry("a.json", ObjectType::File),
                entry("b.png", ObjectType::File),
                entry("nested", ObjectType::Directory),
            ],
        );
        store.add_directory("QmDir/nested", vec![entry("deep.txt", ObjectType::File)]);

        let resolved = resolver(&store, &ScriptedFetcher::new())
            .resolve("ipfs://QmDir", false)
            .await
            .unwrap();

        assert_eq!(resolved.kind(), ContentKind::Directory);
        let listing = resolved.directory().unwrap();
        assert_eq!(listing.files.len(), 3);
        assert_eq!(listing.path, "/");
        assert_eq!(listing.to_json()["type"], "directory");
    }

    #[tokio::test]
    async fn gateway_only_used_after_primary_failure() {
        let store = MemoryStore::new();
        store.add_file("QmRoot/1.png", PNG);
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&format!("{GATEWAY}/ipfs/QmRoot/1.png"), "image/png", PNG);
        let resolver = resolver(&store, &fetcher);

        resolver.resolve("ipfs://QmRoot/1.png", false).await.unwrap();
        assert!(fetcher.requests().is_empty());

        store.set_unreachable(true);
        let resolved = resolver.resolve("ipfs://QmRoot/1.png", false).await.unwrap();
        assert_eq!(resolved.source, ContentSource::Gateway);
        assert_eq!(fetcher.requests(), vec![format!("{GATEWAY}/ipfs/QmRoot/1.png")]);
    }

    #[tokio::test]
    async fn both_paths_failing_reports_both_errors() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let fetcher = ScriptedFetcher::new();
        fetcher.fail(&format!("{GATEWAY}/ipfs/QmGone"));

        let err = resolver(&store, &fetcher)
            .resolve("ipfs://QmGone", false)
            .await
            .unwrap_err();

        match err {
            ContentError::Unavailable { primary, fallback } => {
                assert!(matches!(primary, StoreError::Unreachable(_)));
                assert!(matches!(fallback, FetchError::Request { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_primary_times_out_into_fallback() {
        let store = MemoryStore::new();
        store.add_file("QmSlow/1.png", PNG);
        store.set_delay(Duration::from_millis(500));
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&format!("{GATEWAY}/ipfs/QmSlow/1.png"), "image/png", PNG);

        let resolved = resolver(&store, &fetcher)
            .with_primary_timeout(Duration::from_millis(20))
            .resolve("ipfs://QmSlow/1.png", false)
            .await
            .unwrap();

        assert_eq!(resolved.source, ContentSource::Gateway);
    }

    #[tokio::test]
    async fn nft_metadata_records_image_root() {
        let store = MemoryStore::new();
        let doc = json!({ "name": "Hero", "attributes": [], "image": "ipfs://QmImg/hero.png" });
        store.add_file("QmMeta/1", doc.to_string());
        let resolver = resolver(&store, &ScriptedFetcher::new());

        let resolved = resolver.resolve("ipfs://QmMeta/1", false).await.unwrap();

        assert_eq!(resolved.mime_type, MIME_JSON);
        assert_eq!(resolved.json().unwrap()["name"], "Hero");
        assert!(resolver.discovered().contains("QmImg"));
    }

    #[tokio::test]
    async fn unknown_non_json_file_is_binary() {
        let store = MemoryStore::new();
        store.add_file("QmBlob/data.bin", &b"\x00\x01not json"[..]);

        let resolved = resolver(&store, &ScriptedFetcher::new())
            .resolve("/ipfs/QmBlob/data.bin", false)
            .await
            .unwrap();

        assert_eq!(resolved.kind(), ContentKind::Binary);
        assert_eq!(resolved.mime_type, MIME_BINARY);
        assert_eq!(resolved.object.unwrap().path, "data.bin");
    }

    #[tokio::test]
    async fn streams_images_when_asked() {
        let store = MemoryStore::new();
        store.add_file("QmRoot/1.png", PNG);

        let resolved = resolver(&store, &ScriptedFetcher::new())
            .resolve("ipfs://QmRoot/1.png", true)
            .await
            .unwrap();

        assert_eq!(resolved.kind(), ContentKind::Stream);
        assert_eq!(resolved.length, Some(PNG.len() as u64));
        let Payload::Stream(stream) = resolved.payload else {
            panic!("expected a stream");
        };
        assert_eq!(collect(stream).await.unwrap().as_ref(), PNG);
    }

    #[tokio::test]
    async fn http_json_is_parsed() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("https://meta.test/1", "application/json", r#"{"name":"x"}"#);

        let resolved = resolver(&MemoryStore::new(), &fetcher)
            .resolve("https://meta.test/1", false)
            .await
            .unwrap();

        assert_eq!(resolved.source, ContentSource::Http);
        assert_eq!(resolved.json().unwrap()["name"], "x");
    }

    #[tokio::test]
    async fn malformed_http_json_degrades_to_binary() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("https://meta.test/bad", "application/json", "{not json");

        let resolved = resolver(&MemoryStore::new(), &fetcher)
            .resolve("https://meta.test/bad", false)
            .await
            .unwrap();

        assert_eq!(resolved.kind(), ContentKind::Binary);
        assert_eq!(resolved.mime_type, MIME_JSON);
        assert_eq!(resolved.bytes().unwrap().as_ref(), b"{not json");
    }

    #[tokio::test]
    async fn http_failure_is_a_fetch_error() {
        let fetcher = ScriptedFetcher::new();
        let err = resolver(&MemoryStore::new(), &fetcher)
            .resolve("https://meta.test/missing", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Http(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn empty_root_is_invalid() {
        let err = resolver(&MemoryStore::new(), &ScriptedFetcher::new())
            .resolve("ipfs://", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn stalled_json_body_times_out() {
        let fetcher = ScriptedFetcher::new();
        fetcher.stall("https://slow.test/meta.json", "application/json");
        let resolver = resolver(&MemoryStore::new(), &fetcher)
            .with_gateway(GATEWAY, Duration::from_millis(50));

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve("https://slow.test/meta.json", true),
        )
        .await
        .expect("resolve must finish within the gateway timeout")
        .unwrap_err();

        assert!(matches!(err, ContentError::Http(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn stalled_binary_stream_is_handed_back() {
        let fetcher = ScriptedFetcher::new();
        fetcher.stall("https://slow.test/blob", "application/octet-stream");
        let resolver = resolver(&MemoryStore::new(), &fetcher)
            .with_gateway(GATEWAY, Duration::from_millis(50));

        let resolved = resolver.resolve("https://slow.test/blob", true).await.unwrap();
        assert_eq!(resolved.kind(), ContentKind::Stream);
    }

    #[tokio::test]
    async fn stalled_gateway_reports_timeout() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let fetcher = ScriptedFetcher::new();
        fetcher.stall(&format!("{GATEWAY}/ipfs/QmStuck/1.png"), "image/png");
        let resolver = resolver(&store, &fetcher).with_gateway(GATEWAY, Duration::from_millis(50));

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve("ipfs://QmStuck/1.png", false),
        )
        .await
        .expect("resolve must finish within the gateway timeout")
        .unwrap_err();

        match err {
            ContentError::Unavailable { primary, fallback } => {
                assert!(matches!(primary, StoreError::Unreachable(_)));
                assert!(matches!(fallback, FetchError::Timeout(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_non_json_body_is_binary() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(
            &format!("{GATEWAY}/ipfs/QmBlob/data.bin"),
            "text/html",
            &b"<html>not json</html>"[..],
        );

        let resolved = resolver(&store, &fetcher)
            .resolve("ipfs://QmBlob/data.bin", false)
            .await
            .unwrap();

        assert_eq!(resolved.kind(), ContentKind::Binary);
        assert_eq!(resolved.mime_type, MIME_BINARY);
        assert_eq!(resolved.source, ContentSource::Gateway);
        assert_eq!(resolved.bytes().unwrap().as_ref(), b"<html>not json</html>");
    }

    #[tokio::test]
    async fn gateway_nft_metadata_records_image_root() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let fetcher = ScriptedFetcher::new();
        let doc = json!({ "name": "Hero", "attributes": [], "image": "ipfs://QmGwImg/hero.png" });
        fetcher.respond(
            &format!("{GATEWAY}/ipfs/QmMeta/7"),
            "application/json",
            doc.to_string(),
        );
        let resolver = resolver(&store, &fetcher);

        let resolved = resolver.resolve("ipfs://QmMeta/7", false).await.unwrap();

        assert_eq!(resolved.source, ContentSource::Gateway);
        assert_eq!(resolved.mime_type, MIME_JSON);
        assert!(resolver.discovered().contains("QmGwImg"));
    }
}

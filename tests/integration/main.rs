//! Waymark integration test harness.
//!
//! End-to-end flows through the public services API, wired to the scripted
//! ledger, the in-memory content store and the scripted fetcher. Nothing
//! here touches the network, so every test runs under a plain
//! `cargo test --test integration`.

mod content;
mod resolution;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use waymark_core::NetworkRef;
use waymark_services::testing::{MemoryStore, ScriptedFetcher, ScriptedLedger};
use waymark_services::{
    ClientPool, ContentResolver, DiscoveredContent, IndexStore, TokenResolver,
};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const GATEWAY: &str = "https://gateway.test";

pub fn net(byte: u8) -> NetworkRef {
    NetworkRef::new(vec![byte])
}

/// The network hint-less searches start from.
pub fn origin() -> NetworkRef {
    net(0xaa)
}

pub struct Harness {
    pub ledger: ScriptedLedger,
    pub store: MemoryStore,
    pub fetcher: ScriptedFetcher,
    pub index: IndexStore,
    pub discovered: DiscoveredContent,
    pub pool: Arc<ClientPool>,
    pub tokens: Arc<TokenResolver>,
    pub content: Arc<ContentResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_index(IndexStore::open_in_memory().expect("in-memory index"))
    }

    /// Fresh scripted backends over an existing index, as after a restart.
    pub fn with_index(index: IndexStore) -> Self {
        let ledger = ScriptedLedger::new();
        let store = MemoryStore::new();
        let fetcher = ScriptedFetcher::new();
        let discovered = DiscoveredContent::new();

        let pool = Arc::new(ClientPool::with_retry_policy(
            Arc::new(ledger.clone()),
            3,
            Duration::from_millis(1),
        ));
        let tokens = Arc::new(TokenResolver::new(
            pool.clone(),
            index.clone(),
            origin(),
            Some(32),
        ));
        let content = Arc::new(
            ContentResolver::new(
                Arc::new(store.clone()),
                Arc::new(fetcher.clone()),
                discovered.clone(),
            )
            .with_primary_timeout(Duration::from_secs(1))
            .with_gateway(GATEWAY, Duration::from_secs(2)),
        );

        Self {
            ledger,
            store,
            fetcher,
            index,
            discovered,
            pool,
            tokens,
            content,
        }
    }
}

/// Per-test scratch directory under the system temp dir, removed on drop.
pub struct ScratchDir(pub PathBuf);

impl ScratchDir {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("waymark-it-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Self(dir)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

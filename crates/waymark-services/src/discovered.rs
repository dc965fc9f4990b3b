//! Process-wide set of content roots seen while serving NFT metadata.
//!
//! Write-only from the resolver's side; nothing in this process reads it
//! back except status reporting. Cleared on restart.

use std::sync::Arc;

use dashmap::DashSet;
use serde_json::Value;

use crate::content_uri::scheme_root;

#[derive(Clone, Default)]
pub struct DiscoveredContent {
    roots: Arc<DashSet<String>>,
}

impl DiscoveredContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `root` was not already known.
    pub fn record(&self, root: impl Into<String>) -> bool {
        self.roots.insert(root.into())
    }

    /// Record the image root of an NFT metadata document. A document counts
    /// as NFT metadata when it carries `attributes` and a scheme-prefixed
    /// string `image`.
    pub fn record_from_metadata(&self, doc: &Value) -> Option<String> {
        let has_attributes = doc.get("attributes").is_some_and(|a| !a.is_null());
        if !has_attributes {
            return None;
        }
        let root = doc.get("image").and_then(Value::as_str).and_then(scheme_root)?;
        if self.record(root) {
            tracing::debug!(root, "discovered nft image root");
        }
        Some(root.to_string())
    }

    pub fn contains(&self, root: &str) -> bool {
        self.roots.contains(root)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sorted copy of the current set.
    pub fn snapshot(&self) -> Vec<String> {
        let mut roots: Vec<String> = self.roots.iter().map(|r| r.key().clone()).collect();
        roots.sort();
        roots
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<String> {
        let roots = self.snapshot();
        for root in &roots {
            self.roots.remove(root);
        }
        roots
    }
}

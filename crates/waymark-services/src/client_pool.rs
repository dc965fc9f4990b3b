//! One long-lived client per ledger network.
//!
//! Clients are built lazily and kept until a transport failure, at which
//! point the whole handle is dropped and the next use rebuilds it. The map
//! is shared by every in-flight resolution.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use waymark_core::{NetworkRef, QueryError};

use crate::ledger::{NetworkClient, NetworkConnector};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct ClientPool {
    connector: Arc<dyn NetworkConnector>,
    clients: DashMap<NetworkRef, Arc<dyn NetworkClient>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ClientPool {
    pub fn new(connector: Arc<dyn NetworkConnector>) -> Self {
        Self::with_retry_policy(connector, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_policy(
        connector: Arc<dyn NetworkConnector>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            connector,
            clients: DashMap::new(),
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Cached client for `network`, constructing one if needed.
    ///
    /// Two tasks racing on the same network may both connect; the first
    /// insert wins and the loser's client is dropped.
    pub async fn acquire(&self, network: &NetworkRef) -> Result<Arc<dyn NetworkClient>, QueryError> {
        if let Some(client) = self.clients.get(network) {
            return Ok(client.value().clone());
        }

        tracing::debug!(network = %network.short(), "constructing network client");
        let client = self.connector.connect(network).await?;
        let cached = self
            .clients
            .entry(network.clone())
            .or_insert(client)
            .value()
            .clone();
        Ok(cached)
    }

    /// Drop the cached client. Returns true if one was cached.
    pub fn invalidate(&self, network: &NetworkRef) -> bool {
        let removed = self.clients.remove(network).is_some();
        if removed {
            tracing::debug!(network = %network.short(), "network client invalidated");
        }
        removed
    }

    /// Drop `failed` if it is still the cached client. A replacement built
    /// by another task in the meantime is left alone.
    fn evict(&self, network: &NetworkRef, failed: &Arc<dyn NetworkClient>) -> bool {
        let removed = self
            .clients
            .remove_if(network, |_, cached| Arc::ptr_eq(cached, failed))
            .is_some();
        if removed {
            tracing::debug!(network = %network.short(), "failed network client evicted");
        }
        removed
    }

    /// Run a query with the pool's retry policy.
    ///
    /// Transport failures (including failing to construct a client) evict
    /// the client and retry after `retry_delay`, up to `max_attempts` in
    /// total. Any other error is returned on first sight.
    pub async fn execute(
        &self,
        network: &NetworkRef,
        query: &str,
        args: &Value,
    ) -> Result<Option<Value>, QueryError> {
        let mut attempt = 1;
        loop {
            let (result, used) = match self.acquire(network).await {
                Ok(client) => (client.query(query, args).await, Some(client)),
                Err(e) => (Err(e), None),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() => {
                    if let Some(failed) = used {
                        self.evict(network, &failed);
                    }
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            network = %network.short(),
                            query,
                            attempts = attempt,
                            error = %e,
                            "remote query failed, giving up"
                        );
                        return Err(e);
                    }
                    tracing::warn!(
                        network = %network.short(),
                        query,
                        attempt,
                        error = %e,
                        "remote query failed, retrying with a fresh client"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Number of cached clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

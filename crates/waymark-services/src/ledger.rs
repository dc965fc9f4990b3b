//! Remote ledger query capability.
//!
//! The wire protocol belongs to whoever implements these traits. The rest of
//! the crate only relies on request/response semantics: `Ok(None)` means the
//! network answered "nothing here", an error means it could not be asked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use waymark_core::{NetworkRef, QueryError};

/// A live connection to one network.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn query(&self, name: &str, args: &Value) -> Result<Option<Value>, QueryError>;
}

/// Builds clients. Construction may involve discovery and handshakes, so
/// callers keep the result around (see `ClientPool`).
#[async_trait]
pub trait NetworkConnector: Send + Sync {
    async fn connect(&self, network: &NetworkRef) -> Result<Arc<dyn NetworkClient>, QueryError>;
}

// ── HTTP implementation ───────────────────────────────────────────────────────

/// Connects through a pool of directory nodes, binding each client to the
/// first node that answers its version probe.
pub struct HttpConnector {
    http: reqwest::Client,
    node_urls: Vec<String>,
}

impl HttpConnector {
    pub fn new(node_urls: Vec<String>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        let node_urls = node_urls
            .into_iter()
            .map(|u| u.trim_end_matches('/').to_string())
            .collect();
        Ok(Self { http, node_urls })
    }
}

#[async_trait]
impl NetworkConnector for HttpConnector {
    async fn connect(&self, network: &NetworkRef) -> Result<Arc<dyn NetworkClient>, QueryError> {
        for node in &self.node_urls {
            match self.http.get(format!("{node}/version")).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(network = %network.short(), node, "bound network client");
                    return Ok(Arc::new(HttpNetworkClient {
                        http: self.http.clone(),
                        endpoint: format!("{node}/query/{}", network.to_hex()),
                        network: network.clone(),
                    }));
                }
                Ok(resp) => {
                    tracing::debug!(node, status = resp.status().as_u16(), "node probe refused");
                }
                Err(e) => {
                    tracing::debug!(node, error = %e, "node probe failed");
                }
            }
        }
        Err(QueryError::transport(network, "no directory node reachable"))
    }
}

struct HttpNetworkClient {
    http: reqwest::Client,
    endpoint: String,
    network: NetworkRef,
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn query(&self, name: &str, args: &Value) -> Result<Option<Value>, QueryError> {
        let mut body = Map::new();
        body.insert("type".into(), Value::String(name.to_string()));
        if let Value::Object(fields) = args {
            body.extend(fields.clone());
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::transport(&self.network, e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(QueryError::transport(&self.network, format!("node answered {status}")));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(QueryError::Rejected {
                network: self.network.clone(),
                query: name.to_string(),
                message: format!("{status}: {message}"),
            });
        }

        let value: Value = resp.json().await.map_err(|e| QueryError::Decode {
            network: self.network.clone(),
            query: name.to_string(),
            message: e.to_string(),
        })?;
        Ok((!value.is_null()).then_some(value))
    }
}

//! Durable token → last-known-network hints, backed by SQLite.
//!
//! At most one row per token. Rows are advisory: the resolver writes one
//! after a successful locate and deletes it after a confirmed miss, and
//! concurrent writers settle on last-writer-wins.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use waymark_core::{NetworkRef, TokenId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationHint {
    pub token: TokenId,
    pub network: NetworkRef,
    /// Unix ms of the last write.
    pub updated_at: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to prepare index directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("index task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("index connection poisoned")]
    Poisoned,
    #[error("corrupt index row for token {token}: {message}")]
    Corrupt { token: String, message: String },
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS token_index (
    token_id   TEXT PRIMARY KEY,
    network    TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct IndexStore {
    conn: Arc<Mutex<Connection>>,
}

impl IndexStore {
    /// Open (creating if needed) the index at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::from_connection(Connection::open(path)?)?;
        tracing::info!(path = %path.display(), "location index opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, IndexError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, IndexError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, IndexError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| IndexError::Poisoned)?;
            f(&*guard)
        })
        .await?
    }

    pub async fn find(&self, token: &TokenId) -> Result<Option<LocationHint>, IndexError> {
        let token = token.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT network, updated_at FROM token_index WHERE token_id = ?1",
                    params![token.to_hex()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            row.map(|(network, updated_at)| {
                let network = NetworkRef::from_hex(&network).map_err(|e| IndexError::Corrupt {
                    token: token.to_hex(),
                    message: e.to_string(),
                })?;
                Ok(LocationHint {
                    token: token.clone(),
                    network,
                    updated_at: updated_at.max(0) as u64,
                })
            })
            .transpose()
        })
        .await
    }

    /// Insert the hint, or move it to `network` and refresh its timestamp.
    pub async fn upsert(&self, token: &TokenId, network: &NetworkRef) -> Result<(), IndexError> {
        let (token, network) = (token.to_hex(), network.to_hex());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO token_index (token_id, network, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(token_id) DO UPDATE SET
                     network = excluded.network,
                     updated_at = excluded.updated_at",
                params![token, network, now_ms() as i64],
            )?;
            Ok(())
        })
        .await
    }

    /// Delete the hint. Returns true if one existed.
    pub async fn remove(&self, token: &TokenId) -> Result<bool, IndexError> {
        let token = token.to_hex();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM token_index WHERE token_id = ?1", params![token])?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Number of hints held.
    pub async fn count(&self) -> Result<u64, IndexError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM token_index", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
    }
}

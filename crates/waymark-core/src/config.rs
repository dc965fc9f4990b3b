//! Configuration system for Waymark.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WAYMARK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/waymark/config.toml
//!   3. ~/.config/waymark/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ids::{IdError, NetworkRef};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaymarkConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP API port.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the token location index.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory node URLs used to reach ledger networks.
    pub directory_node_urls: Vec<String>,
    /// Hex id of the network where searches without a cached hint begin.
    pub origin_network: String,
    /// Attempts per remote query before the failure is surfaced.
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Redirect hops a single locate may take. 0 = unlimited.
    pub max_hops: usize,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Content-addressed store node RPC URL.
    pub node_url: String,
    /// Public gateway used after a primary store failure.
    pub gateway_url: String,
    pub primary_timeout_secs: u64,
    pub gateway_timeout_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("index.db"),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            directory_node_urls: Vec::new(),
            origin_network: String::new(),
            max_attempts: 3,
            retry_delay_ms: 1000,
            max_hops: 32,
            request_timeout_secs: 10,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            node_url: "http://localhost:5001".to_string(),
            gateway_url: "https://ipfs.io".to_string(),
            primary_timeout_secs: 5,
            gateway_timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    pub fn origin(&self) -> Result<NetworkRef, IdError> {
        NetworkRef::from_hex(&self.origin_network)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn hop_limit(&self) -> Option<usize> {
        (self.max_hops > 0).then_some(self.max_hops)
    }
}

impl ContentConfig {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("waymark")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("waymark")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WaymarkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            WaymarkConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WAYMARK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WaymarkConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply WAYMARK_* overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WAYMARK_SERVER__PORT") {
            if let Ok(p) = v.parse() {
                self.server.port = p;
            }
        }
        if let Some(v) = lookup("WAYMARK_DATABASE__PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("WAYMARK_LEDGER__DIRECTORY_NODE_URLS") {
            self.ledger.directory_node_urls = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("WAYMARK_LEDGER__ORIGIN_NETWORK") {
            self.ledger.origin_network = v;
        }
        if let Some(v) = lookup("WAYMARK_CONTENT__NODE_URL") {
            self.content.node_url = v;
        }
        if let Some(v) = lookup("WAYMARK_CONTENT__GATEWAY_URL") {
            self.content.gateway_url = v;
        }
    }
}

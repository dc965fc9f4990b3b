//! waymarkd — token location and content resolution daemon.

use std::sync::Arc;

use anyhow::{Context, Result};

use waymark_api::ApiState;
use waymark_core::config::WaymarkConfig;
use waymark_services::{
    ClientPool, ContentResolver, DiscoveredContent, HttpConnector, IndexStore, ReqwestFetcher,
    RpcContentStore, TokenResolver,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = WaymarkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = WaymarkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        WaymarkConfig::default()
    });

    let origin = config
        .ledger
        .origin()
        .context("ledger.origin_network must be a non-empty hex network id")?;
    if config.ledger.directory_node_urls.is_empty() {
        anyhow::bail!("ledger.directory_node_urls is empty");
    }
    tracing::info!(
        origin = %origin.short(),
        nodes = config.ledger.directory_node_urls.len(),
        "waymarkd starting"
    );

    // ── Ledger side ──────────────────────────────────────────────────────────

    let index = IndexStore::open(&config.database.path)
        .with_context(|| format!("failed to open index at {}", config.database.path.display()))?;

    let connector = HttpConnector::new(
        config.ledger.directory_node_urls.clone(),
        config.ledger.request_timeout(),
    )
    .context("failed to build ledger http client")?;
    let pool = Arc::new(ClientPool::with_retry_policy(
        Arc::new(connector),
        config.ledger.max_attempts,
        config.ledger.retry_delay(),
    ));
    let tokens = Arc::new(TokenResolver::new(
        pool.clone(),
        index.clone(),
        origin,
        config.ledger.hop_limit(),
    ));

    // ── Content side ─────────────────────────────────────────────────────────

    let store = RpcContentStore::new(&config.content.node_url)
        .context("failed to build content store client")?;
    let fetcher = ReqwestFetcher::new().context("failed to build http fetcher")?;
    let discovered = DiscoveredContent::new();
    let content = Arc::new(
        ContentResolver::new(Arc::new(store), Arc::new(fetcher), discovered.clone())
            .with_primary_timeout(config.content.primary_timeout())
            .with_gateway(config.content.gateway_url.clone(), config.content.gateway_timeout()),
    );
    tracing::info!(
        node = %config.content.node_url,
        gateway = %config.content.gateway_url,
        "content resolver ready"
    );

    let state = ApiState {
        tokens,
        content,
        pool,
        index,
        discovered,
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        r = waymark_api::serve(state, config.server.port) => {
            r.context("API server exited")?;
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

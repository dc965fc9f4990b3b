//! Token resolution: the location index plus the locator, with the
//! cache-maintenance rules that tie them together.
//!
//! - found     → hint upserted to the serving network
//! - not found → hint removed, so the next call searches from the origin
//! - error     → hint left alone; a failed hop proves nothing about the token

use std::sync::Arc;

use waymark_core::{NetworkRef, QueryError, TokenId, TokenInfo};

use crate::client_pool::ClientPool;
use crate::index_store::{IndexError, IndexStore};
use crate::locator::Locator;
use crate::queries;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

pub struct TokenResolver {
    pool: Arc<ClientPool>,
    index: IndexStore,
    locator: Locator,
    origin: NetworkRef,
}

impl TokenResolver {
    /// `origin` is both where hint-less searches begin and the issuing
    /// network metadata queries are scoped to.
    pub fn new(
        pool: Arc<ClientPool>,
        index: IndexStore,
        origin: NetworkRef,
        max_hops: Option<usize>,
    ) -> Self {
        let locator = Locator::new(pool.clone(), origin.clone(), max_hops);
        Self {
            pool,
            index,
            locator,
            origin,
        }
    }

    pub fn origin(&self) -> &NetworkRef {
        &self.origin
    }

    pub async fn resolve(&self, id: &TokenId) -> Result<Option<TokenInfo>, ResolveError> {
        let hint = self.index.find(id).await?;
        let start = match &hint {
            Some(h) => h.network.clone(),
            None => self.origin.clone(),
        };
        tracing::debug!(token = %id.short(), start = %start.short(), cached = hint.is_some(), "resolving token");

        match self.locator.locate(&start, id).await {
            Ok(Some(info)) => {
                self.index.upsert(id, &info.location).await?;
                Ok(Some(info))
            }
            Ok(None) => {
                if self.index.remove(id).await? {
                    tracing::info!(token = %id.short(), stale = %start.short(), "evicted stale location hint");
                }
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(token = %id.short(), error = %e, "locate failed, location index untouched");
                Err(e.into())
            }
        }
    }

    /// Resolve the token an extending-metadata URI belongs to.
    pub async fn resolve_by_uri(&self, uri: &str) -> Result<Option<TokenInfo>, ResolveError> {
        match queries::token_target_by_uri(&self.pool, &self.origin, uri).await? {
            Some(target) => self.resolve(&target.id).await,
            None => Ok(None),
        }
    }

    /// Resolve the token behind an ERC721 collection / sequence number pair.
    pub async fn resolve_by_collection(
        &self,
        collection: &str,
        token_number: u64,
    ) -> Result<Option<TokenInfo>, ResolveError> {
        match queries::token_target_by_collection(&self.pool, &self.origin, collection, token_number)
            .await?
        {
            Some(target) => self.resolve(&target.id).await,
            None => Ok(None),
        }
    }
}

//! Chain-hopping search for a token's live metadata.
//!
//! Starting from one network, ask for the token's metadata; if the network
//! has no record, ask where the token went and follow that redirect. Every
//! network is visited at most once, so malformed redirect data that forms
//! a cycle ends the search instead of looping.

use std::collections::HashSet;
use std::sync::Arc;

use waymark_core::{NetworkRef, QueryError, TokenId, TokenInfo};

use crate::client_pool::ClientPool;
use crate::queries;

pub struct Locator {
    pool: Arc<ClientPool>,
    issuing: NetworkRef,
    max_hops: Option<usize>,
}

impl Locator {
    /// `issuing` scopes metadata queries; `max_hops` caps redirects followed
    /// in one search (`None` leaves only the cycle guard).
    pub fn new(pool: Arc<ClientPool>, issuing: NetworkRef, max_hops: Option<usize>) -> Self {
        Self {
            pool,
            issuing,
            max_hops,
        }
    }

    /// Find the network currently serving `id`, starting at `start`.
    ///
    /// `Ok(None)` means the redirect chain ended without finding a record.
    /// A transport error on any hop aborts the whole search.
    pub async fn locate(
        &self,
        start: &NetworkRef,
        id: &TokenId,
    ) -> Result<Option<TokenInfo>, QueryError> {
        let mut current = start.clone();
        let mut visited = HashSet::from([start.clone()]);
        let mut hops = 0usize;

        loop {
            if let Some(metadata) =
                queries::active_metadata(&self.pool, &current, id, &self.issuing).await?
            {
                tracing::debug!(token = %id.short(), network = %current.short(), hops, "token located");
                return Ok(Some(TokenInfo {
                    metadata,
                    location: current,
                }));
            }

            let next =
                match queries::recent_transfer_target(&self.pool, &current, id, &self.issuing)
                    .await?
                {
                    Some(next) => next,
                    None => {
                        tracing::info!(token = %id.short(), network = %current.short(), hops, "token not found");
                        return Ok(None);
                    }
                };

            if !visited.insert(next.clone()) {
                tracing::warn!(
                    token = %id.short(),
                    from = %current.short(),
                    to = %next.short(),
                    "redirect revisits a searched network, stopping"
                );
                return Ok(None);
            }

            if self.max_hops.is_some_and(|max| hops >= max) {
                tracing::warn!(token = %id.short(), hops, "hop limit reached, stopping");
                return Ok(None);
            }

            tracing::debug!(token = %id.short(), from = %current.short(), to = %next.short(), "following redirect");
            hops += 1;
            current = next;
        }
    }
}

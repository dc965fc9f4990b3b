//! Typed wrappers around the ledger queries the resolver issues.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use waymark_core::{MetadataRecord, NetworkRef, QueryError, TokenId, TokenTarget};

use crate::client_pool::ClientPool;

pub const ACTIVE_METADATA: &str = "yours.active_metadata";
pub const TRANSFER_HISTORY: &str = "yours.get_transfer_history";
pub const TARGET_BY_URI: &str = "oracle.get_token_target_by_extending_metadata_uri";
pub const TARGET_BY_COLLECTION: &str = "oracle.get_token_target_by_erc721_collection";

#[derive(Deserialize)]
struct TransferHistory {
    #[serde(default)]
    data: Vec<TransferEntry>,
}

#[derive(Deserialize)]
struct TransferEntry {
    blockchain_rid: NetworkRef,
}

fn decode<T: DeserializeOwned>(
    network: &NetworkRef,
    query: &str,
    value: Option<Value>,
) -> Result<Option<T>, QueryError> {
    value
        .map(|v| {
            serde_json::from_value(v).map_err(|e| QueryError::Decode {
                network: network.clone(),
                query: query.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Live metadata for `id` on `network`, scoped to its issuing network.
pub async fn active_metadata(
    pool: &ClientPool,
    network: &NetworkRef,
    id: &TokenId,
    issuing: &NetworkRef,
) -> Result<Option<MetadataRecord>, QueryError> {
    let args = json!({ "id": id.to_hex(), "issuing_chain": issuing.to_hex() });
    let value = pool.execute(network, ACTIVE_METADATA, &args).await?;
    decode(network, ACTIVE_METADATA, value)
}

/// Where `network` last saw `id` go: the destination of its most recent
/// outgoing transfer.
pub async fn recent_transfer_target(
    pool: &ClientPool,
    network: &NetworkRef,
    id: &TokenId,
    issuing: &NetworkRef,
) -> Result<Option<NetworkRef>, QueryError> {
    let args = json!({
        "account_id": null,
        "id": id.to_hex(),
        "issuing_chain": issuing.to_hex(),
        "from_height": null,
        "page_cursor": null,
        "type": "sent",
        "page_size": 1,
    });
    let value = pool.execute(network, TRANSFER_HISTORY, &args).await?;
    let history: Option<TransferHistory> = decode(network, TRANSFER_HISTORY, value)?;
    Ok(history.and_then(|h| h.data.into_iter().next().map(|e| e.blockchain_rid)))
}

pub async fn token_target_by_uri(
    pool: &ClientPool,
    network: &NetworkRef,
    uri: &str,
) -> Result<Option<TokenTarget>, QueryError> {
    let value = pool.execute(network, TARGET_BY_URI, &json!({ "uri": uri })).await?;
    decode(network, TARGET_BY_URI, value)
}

pub async fn token_target_by_collection(
    pool: &ClientPool,
    network: &NetworkRef,
    collection: &str,
    token_number: u64,
) -> Result<Option<TokenTarget>, QueryError> {
    let args = json!({ "collection": collection, "token_id": token_number });
    let value = pool.execute(network, TARGET_BY_COLLECTION, &args).await?;
    decode(network, TARGET_BY_COLLECTION, value)
}

//! Failures of a remote ledger query.
//!
//! A query that completes and finds nothing is not an error: clients return
//! `Ok(None)`. Only the three cases below are errors, and only `Transport`
//! is worth retrying.

use crate::ids::NetworkRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Timeout, refused connection, or a node-side failure.
    #[error("transport failure talking to network {network}: {message}")]
    Transport { network: NetworkRef, message: String },

    /// The network answered and refused the query.
    #[error("network {network} rejected query {query}: {message}")]
    Rejected {
        network: NetworkRef,
        query: String,
        message: String,
    },

    /// The network answered with something we could not interpret.
    #[error("undecodable response to {query} from network {network}: {message}")]
    Decode {
        network: NetworkRef,
        query: String,
        message: String,
    },
}

impl QueryError {
    pub fn transport(network: &NetworkRef, message: impl Into<String>) -> Self {
        Self::Transport {
            network: network.clone(),
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn network(&self) -> &NetworkRef {
        match self {
            Self::Transport { network, .. }
            | Self::Rejected { network, .. }
            | Self::Decode { network, .. } => network,
        }
    }
}

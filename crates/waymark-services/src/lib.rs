//! waymark-services: token location and content resolution.
//!
//! Ledger side: `ClientPool` → `Locator` → `TokenResolver`, with the
//! `IndexStore` remembering where each token was last found.
//! Content side: `ContentResolver` over a `ContentStore` and a `Fetcher`.

pub mod client_pool;
pub mod content_resolver;
pub mod content_store;
pub mod content_types;
pub mod content_uri;
pub mod discovered;
pub mod fetcher;
pub mod index_store;
pub mod ledger;
pub mod locator;
pub mod queries;
pub mod testing;
pub mod token_resolver;

pub use client_pool::ClientPool;
pub use content_resolver::{ContentError, ContentResolver};
pub use content_store::{ContentStore, RpcContentStore, StoreError};
pub use content_types::{ContentDescriptor, ContentKind, ContentSource, Payload};
pub use discovered::DiscoveredContent;
pub use fetcher::{FetchError, Fetcher, ReqwestFetcher};
pub use index_store::{IndexError, IndexStore, LocationHint};
pub use ledger::{HttpConnector, NetworkClient, NetworkConnector};
pub use locator::Locator;
pub use token_resolver::{ResolveError, TokenResolver};

//! waymark-core: identifiers, token metadata, configuration, and the
//! remote-query error taxonomy. All other Waymark crates depend on this one.

pub mod config;
pub mod error;
pub mod format;
pub mod ids;
pub mod metadata;

pub use error::QueryError;
pub use ids::{IdError, NetworkRef, TokenId};
pub use metadata::{FormatTag, MetadataRecord, TokenInfo, TokenSection, TokenTarget};

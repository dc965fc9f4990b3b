//! Canonical token metadata as served by a ledger network.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ids::{NetworkRef, TokenId};

/// A metadata format (module) a token declares support for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Erc721,
    Erc1155,
    Other(String),
}

impl FormatTag {
    pub fn parse(name: &str) -> Self {
        match name {
            "erc721" => Self::Erc721,
            "erc1155" => Self::Erc1155,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Erc721 => "erc721",
            Self::Erc1155 => "erc1155",
            Self::Other(name) => name,
        }
    }
}

impl Serialize for FormatTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// Token-level section of a metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSection {
    pub issuing_chain: NetworkRef,
    #[serde(default)]
    pub decimals: i64,
    /// Formats this token supports.
    #[serde(default)]
    pub modules: Vec<FormatTag>,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Networks this token has lived on.
    #[serde(default)]
    pub blockchains: Vec<NetworkRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    /// Free-form property groups keyed by module name.
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(rename = "yours")]
    pub token: TokenSection,
}

impl MetadataRecord {
    pub fn supports(&self, tag: &FormatTag) -> bool {
        self.token.modules.contains(tag)
    }
}

/// A located token: its live metadata and the network serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub metadata: MetadataRecord,
    pub location: NetworkRef,
}

/// Token identity resolved from an indirect reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTarget {
    pub id: TokenId,
    pub issuing_chain: NetworkRef,
}

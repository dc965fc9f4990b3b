//! Opaque byte identifiers for tokens and ledger networks.
//!
//! Both are arbitrary-length byte strings. Their text form is lowercase hex;
//! parsing tolerates a `0x` prefix and upper-case digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier is not valid hex: {0}")]
    InvalidHex(String),
}

fn decode_hex(text: &str) -> Result<Vec<u8>, IdError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(IdError::Empty);
    }
    hex::decode(digits).map_err(|e| IdError::InvalidHex(e.to_string()))
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn from_hex(text: &str) -> Result<Self, IdError> {
                decode_hex(text).map(Self)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// First eight hex digits, for log lines.
            pub fn short(&self) -> String {
                let full = self.to_hex();
                full[..8.min(full.len())].to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_hex(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// Identifies a token across every network it may live on.
    TokenId
);

hex_id!(
    /// Identifies one independently operated ledger network.
    NetworkRef
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a: TokenId = "0xdeadbeef".parse().unwrap();
        let b: TokenId = "DEADBEEF".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(a.to_string(), "deadbeef");
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(NetworkRef::from_hex(""), Err(IdError::Empty));
        assert_eq!(NetworkRef::from_hex("0x"), Err(IdError::Empty));
        assert!(matches!(
            NetworkRef::from_hex("zz"),
            Err(IdError::InvalidHex(_))
        ));
        assert!(matches!(
            NetworkRef::from_hex("abc"),
            Err(IdError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let network = NetworkRef::new(vec![0xaa, 0x01]);
        let json = serde_json::to_string(&network).unwrap();
        assert_eq!(json, "\"aa01\"");

        let back: NetworkRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, network);
    }

    #[test]
    fn short_form_truncates() {
        let id = TokenId::new(vec![0x11; 16]);
        assert_eq!(id.short(), "11111111");
        assert_eq!(TokenId::new(vec![0xab]).short(), "ab");
    }
}

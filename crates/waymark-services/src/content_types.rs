use std::fmt;

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Byte stream handed through to the caller without buffering.
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

pub const MIME_JSON: &str = "application/json";
pub const MIME_BINARY: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Binary,
    Json,
    Directory,
    Stream,
}

/// Which path served a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Http,
    Primary,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    File,
    Directory,
}

/// Store-side metadata of a content-addressed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectStat {
    pub cid: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
}

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: ObjectType,
    pub size: u64,
    pub cid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub files: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    pub fn to_json(&self) -> Value {
        json!({ "type": "directory", "path": self.path, "files": self.files })
    }
}

pub enum Payload {
    Bytes(Bytes),
    Json(Value),
    Directory(DirectoryListing),
    Stream(ByteStream),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Directory(l) => f.debug_tuple("Directory").field(l).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Object details for content-addressed payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub stat: ObjectStat,
    /// Sub-path inside the root object, "/" for the root itself.
    pub path: String,
}

/// A resolved off-chain payload.
#[derive(Debug)]
pub struct ContentDescriptor {
    pub mime_type: String,
    /// Byte length when known up front.
    pub length: Option<u64>,
    pub payload: Payload,
    pub source: ContentSource,
    pub object: Option<ObjectInfo>,
}

impl ContentDescriptor {
    pub fn kind(&self) -> ContentKind {
        match self.payload {
            Payload::Bytes(_) => ContentKind::Binary,
            Payload::Json(_) => ContentKind::Json,
            Payload::Directory(_) => ContentKind::Directory,
            Payload::Stream(_) => ContentKind::Stream,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn directory(&self) -> Option<&DirectoryListing> {
        match &self.payload {
            Payload::Directory(l) => Some(l),
            _ => None,
        }
    }
}

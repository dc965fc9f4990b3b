//! URI classification and extension-based MIME lookup.

const SCHEME: &str = "ipfs://";
const PATH_PREFIX: &str = "/ipfs/";

const IMAGE_TYPES: [(&str, &str); 7] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("avif", "image/avif"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUri {
    Http(String),
    Addressed(AddressedPath),
}

/// Root object identifier plus an optional path inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedPath {
    pub root: String,
    pub path: Option<String>,
}

impl ContentUri {
    /// `None` when the URI names no object (empty root).
    pub fn parse(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Some(Self::Http(uri.to_string()));
        }

        let rest = uri
            .strip_prefix(SCHEME)
            .or_else(|| uri.strip_prefix(PATH_PREFIX))
            .unwrap_or(uri);
        let (root, path) = match rest.split_once('/') {
            Some((root, path)) => (root, path.trim_matches('/')),
            None => (rest, ""),
        };
        if root.is_empty() {
            return None;
        }

        Some(Self::Addressed(AddressedPath {
            root: root.to_string(),
            path: (!path.is_empty()).then(|| path.to_string()),
        }))
    }
}

impl AddressedPath {
    /// `root[/path]` as the store addresses it.
    pub fn target(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}", self.root, path),
            None => self.root.clone(),
        }
    }

    pub fn display_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| "/".to_string())
    }
}

/// Root identifier of a scheme-prefixed reference, e.g. the CID in
/// `ipfs://<cid>/image.png`.
pub fn scheme_root(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix(SCHEME)?;
    let root = rest.split('/').next().unwrap_or(rest);
    (!root.is_empty()).then_some(root)
}

/// Image MIME type for the extension of the last path segment.
pub fn image_mime(path: &str) -> Option<&'static str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

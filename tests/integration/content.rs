use serde_json::json;
use waymark_services::content_types::{DirectoryEntry, ObjectType};
use waymark_services::{ContentError, ContentKind, ContentSource};

use crate::*;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nintegration-image";

#[tokio::test]
async fn test_png_identical_via_primary_and_gateway() {
    let h = Harness::new();
    h.store.add_file("QmArt/hero.png", PNG);
    h.fetcher
        .respond(&format!("{GATEWAY}/ipfs/QmArt/hero.png"), "image/png", PNG);

    let primary = h.content.resolve("ipfs://QmArt/hero.png", false).await.unwrap();
    h.store.set_unreachable(true);
    let fallback = h.content.resolve("ipfs://QmArt/hero.png", false).await.unwrap();

    assert_eq!(primary.source, ContentSource::Primary);
    assert_eq!(fallback.source, ContentSource::Gateway);
    for d in [&primary, &fallback] {
        assert_eq!(d.mime_type, "image/png");
        assert_eq!(d.bytes().unwrap().as_ref(), PNG);
    }
    assert_eq!(h.fetcher.requests().len(), 1);
}

#[tokio::test]
async fn test_directory_listing_counts_direct_children() {
    let h = Harness::new();
    let entries: Vec<DirectoryEntry> = (0..4)
        .map(|i| DirectoryEntry {
            name: format!("{i}.json"),
            entry_type: ObjectType::File,
            size: 64,
            cid: format!("QmChild{i}"),
        })
        .collect();
    h.store.add_directory("QmCollection", entries);

    let resolved = h.content.resolve("/ipfs/QmCollection", false).await.unwrap();

    assert_eq!(resolved.kind(), ContentKind::Directory);
    let listing = resolved.directory().unwrap().to_json();
    assert_eq!(listing["type"], "directory");
    assert_eq!(listing["files"].as_array().unwrap().len(), 4);
    assert_eq!(listing["files"][0]["type"], "file");
}

#[tokio::test]
async fn test_nft_metadata_feeds_discovered_set() {
    let h = Harness::new();
    for i in 0..3 {
        let doc = json!({
            "name": format!("Hero #{i}"),
            "attributes": [{ "trait_type": "class", "value": "mage" }],
            "image": format!("ipfs://QmImages{i}/hero.png"),
        });
        h.store.add_file(&format!("QmMeta/{i}"), doc.to_string());
        h.content.resolve(&format!("ipfs://QmMeta/{i}"), false).await.unwrap();
    }
    h.store.add_file("QmPlain/doc", json!({ "title": "not an nft" }).to_string());
    h.content.resolve("ipfs://QmPlain/doc", false).await.unwrap();

    assert_eq!(
        h.discovered.snapshot(),
        vec!["QmImages0", "QmImages1", "QmImages2"]
    );
    assert_eq!(h.discovered.drain().len(), 3);
    assert!(h.discovered.is_empty());
}

#[tokio::test]
async fn test_gateway_untouched_while_primary_healthy() {
    let h = Harness::new();
    h.store.add_file("QmDoc/readme", "plain text, not json");

    let resolved = h.content.resolve("ipfs://QmDoc/readme", false).await.unwrap();

    assert_eq!(resolved.kind(), ContentKind::Binary);
    assert!(h.fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_total_outage_reports_unavailable() {
    let h = Harness::new();
    h.store.set_unreachable(true);

    let err = h.content.resolve("ipfs://QmMissing/1.png", false).await.unwrap_err();

    assert!(matches!(err, ContentError::Unavailable { .. }));
    assert_eq!(
        h.fetcher.requests(),
        vec![format!("{GATEWAY}/ipfs/QmMissing/1.png")]
    );
}

#[tokio::test]
async fn test_http_content_classified_by_declared_type() {
    let h = Harness::new();
    h.fetcher
        .respond("https://cdn.test/meta/1", "application/json", r#"{"name":"remote"}"#);
    h.fetcher.respond("https://cdn.test/img/1", "image/webp", &b"RIFFwebp"[..]);

    let json_doc = h.content.resolve("https://cdn.test/meta/1", false).await.unwrap();
    let image = h.content.resolve("https://cdn.test/img/1", false).await.unwrap();

    assert_eq!(json_doc.json().unwrap()["name"], "remote");
    assert_eq!(image.mime_type, "image/webp");
    assert_eq!(image.bytes().unwrap().as_ref(), b"RIFFwebp");
    assert!(h.store.calls() == 0);
}

use std::sync::Arc;

use waymark_core::TokenId;
use waymark_services::queries::{ACTIVE_METADATA, TRANSFER_HISTORY};
use waymark_services::testing::sample_record;
use waymark_services::{IndexStore, ResolveError};

use crate::*;

fn deadbeef() -> TokenId {
    TokenId::from_hex("0xdeadbeef").unwrap()
}

/// Empty index, origin 0xAA redirects to 0xBB, 0xBB holds the record.
#[tokio::test]
async fn test_redirected_token_is_located_and_indexed() {
    let h = Harness::new();
    let token = deadbeef();
    h.ledger.add_redirect(&origin(), &token, &net(0xbb));
    h.ledger.add_record(&net(0xbb), &token, sample_record("Deadbeef", &origin()));

    let info = h.tokens.resolve(&token).await.unwrap().expect("token located");

    assert_eq!(info.location, net(0xbb));
    assert_eq!(info.metadata.name, "Deadbeef");
    assert_eq!(h.index.find(&token).await.unwrap().unwrap().network, net(0xbb));
    assert_eq!(
        h.ledger.queries(),
        vec![
            (origin(), ACTIVE_METADATA.to_string()),
            (origin(), TRANSFER_HISTORY.to_string()),
            (net(0xbb), ACTIVE_METADATA.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_second_resolution_goes_straight_to_hint() {
    let h = Harness::new();
    let token = deadbeef();
    h.ledger.add_redirect(&origin(), &token, &net(0xbb));
    h.ledger.add_record(&net(0xbb), &token, sample_record("Deadbeef", &origin()));

    h.tokens.resolve(&token).await.unwrap();
    let before = h.ledger.query_count();
    h.tokens.resolve(&token).await.unwrap();

    let queries = h.ledger.queries();
    assert_eq!(queries.len(), before + 1);
    assert_eq!(queries[before], (net(0xbb), ACTIVE_METADATA.to_string()));
}

#[tokio::test]
async fn test_moved_token_updates_hint() {
    let h = Harness::new();
    let token = deadbeef();
    h.index.upsert(&token, &net(0xbb)).await.unwrap();
    h.ledger.add_redirect(&net(0xbb), &token, &net(0xcc));
    h.ledger.add_record(&net(0xcc), &token, sample_record("Deadbeef", &origin()));

    let info = h.tokens.resolve(&token).await.unwrap().unwrap();

    assert_eq!(info.location, net(0xcc));
    assert_eq!(h.index.find(&token).await.unwrap().unwrap().network, net(0xcc));
    assert_eq!(h.index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_hard_failure_then_fresh_handle() {
    let h = Harness::new();
    let token = deadbeef();
    h.ledger.add_record(&origin(), &token, sample_record("Deadbeef", &origin()));
    h.ledger.fail_next(&origin(), 3);

    let err = h.tokens.resolve(&token).await.unwrap_err();
    assert!(matches!(err, ResolveError::Query(ref e) if e.is_transport()));
    assert_eq!(h.ledger.connects(&origin()), 3);
    assert!(h.index.find(&token).await.unwrap().is_none());

    let info = h.tokens.resolve(&token).await.unwrap().unwrap();
    assert_eq!(info.location, origin());
    assert_eq!(h.ledger.connects(&origin()), 4);
    assert_eq!(h.pool.len(), 1);
}

#[tokio::test]
async fn test_redirect_cycle_is_not_found_and_evicts_hint() {
    let h = Harness::new();
    let token = deadbeef();
    h.index.upsert(&token, &net(0xbb)).await.unwrap();
    h.ledger.add_redirect(&net(0xbb), &token, &net(0xcc));
    h.ledger.add_redirect(&net(0xcc), &token, &net(0xbb));

    let result = h.tokens.resolve(&token).await.unwrap();

    assert!(result.is_none());
    assert!(h.index.find(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_hint_survives_restart() {
    let scratch = ScratchDir::new("restart");
    let path = scratch.0.join("index.db");
    let token = deadbeef();

    {
        let h = Harness::with_index(IndexStore::open(&path).unwrap());
        h.ledger.add_redirect(&origin(), &token, &net(0xbb));
        h.ledger.add_record(&net(0xbb), &token, sample_record("Deadbeef", &origin()));
        h.tokens.resolve(&token).await.unwrap().unwrap();
    }

    let h = Harness::with_index(IndexStore::open(&path).unwrap());
    h.ledger.add_record(&net(0xbb), &token, sample_record("Deadbeef", &origin()));

    let info = h.tokens.resolve(&token).await.unwrap().unwrap();

    assert_eq!(info.location, net(0xbb));
    assert_eq!(h.ledger.query_count(), 1);
    assert_eq!(h.ledger.connects(&origin()), 0);
}

#[tokio::test]
async fn test_concurrent_resolutions_converge() {
    let h = Harness::new();
    let token = deadbeef();
    h.ledger.add_redirect(&origin(), &token, &net(0xbb));
    h.ledger.add_record(&net(0xbb), &token, sample_record("Deadbeef", &origin()));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let tokens = Arc::clone(&h.tokens);
        let token = token.clone();
        tasks.push(tokio::spawn(async move { tokens.resolve(&token).await }));
    }
    for task in tasks {
        let info = task.await.unwrap().unwrap().unwrap();
        assert_eq!(info.location, net(0xbb));
    }

    assert_eq!(h.index.count().await.unwrap(), 1);
    assert_eq!(h.index.find(&token).await.unwrap().unwrap().network, net(0xbb));
}

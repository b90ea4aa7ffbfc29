//! Golden feed replay: `fixtures/feed/reorg.jsonl` through the ingestion sink.
//!
//! The feed stores three cancels, two cutoffs and two fills, then a fork
//! notice over `(90, 100]`, then the replacement fill from the new chain.

mod common;

use common::*;
use relaystore_core::{
    ChainEvent, CutoffEvent, EventSink, FillEvent, IngestOutcome, QueryService, RecordKind,
    StoreError, StoreSink,
};

fn load_feed(name: &str) -> Vec<ChainEvent> {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures/feed");
    p.push(name);
    let content = std::fs::read_to_string(&p).expect("fixture not found");
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("invalid feed line"))
        .collect()
}

#[tokio::test]
async fn golden_reorg_feed() {
    let feed = load_feed("reorg.jsonl");
    assert_eq!(feed.len(), 9);

    for store in stores().await {
        let queries = QueryService::new(store.clone());
        let sink = StoreSink::new(store.clone(), reconciler(&store));

        let mut outcomes = Vec::new();
        for event in &feed {
            outcomes.push(sink.handle(event).await.unwrap());
        }

        let report = outcomes
            .iter()
            .find_map(|o| match o {
                IngestOutcome::Reconciled(r) => Some(r),
                _ => None,
            })
            .expect("fork notice was applied");
        assert_eq!(report.affected(RecordKind::Fill), 2);
        assert_eq!(report.affected(RecordKind::Cutoff), 1);
        assert_eq!(report.affected(RecordKind::Cancel), 0);

        // the replacement fill is the only one left
        let fills = store.find_all(&FillEvent::default()).await.unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].tx_hash, hash("f3"));
        let found = queries
            .fill_by_ring_and_order(&hash("aa"), &hash("bb"))
            .await
            .unwrap();
        assert_eq!(found.id, fills[0].id);
        assert_eq!(found.amount_s, "1000000000000000000000");
        assert_eq!(found.owner, OWNER);

        // the cutoff at block 99 was forked away
        assert_eq!(queries.latest_cutoff(OWNER).await.unwrap().block_number, 60);
        assert_eq!(store.find_all(&CutoffEvent::default()).await.unwrap().len(), 2);

        assert_eq!(queries.cancels_by_order(&hash("bb")).await.unwrap().len(), 3);
    }
}

#[tokio::test]
async fn replayed_event_is_a_duplicate() {
    let feed = load_feed("reorg.jsonl");
    for store in stores().await {
        let sink = StoreSink::new(store.clone(), reconciler(&store));
        sink.handle(&feed[0]).await.unwrap();
        let err = sink.handle(&feed[0]).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKind { kind: RecordKind::Cancel, .. }));
    }
}

#[tokio::test]
async fn fill_without_market_is_not_stored() {
    let feed = load_feed("reorg.jsonl");
    let mut event = feed[4].clone();
    if let ChainEvent::OrderFilled(ref mut f) = event {
        f.market.clear();
    } else {
        panic!("feed[4] should be a fill");
    }

    for store in stores().await {
        let sink = StoreSink::new(store.clone(), reconciler(&store));
        let err = sink.handle(&event).await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedInput { .. }));
        assert!(store.find_all(&FillEvent::default()).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn inverted_fork_notice_is_rejected() {
    let event: ChainEvent =
        serde_json::from_str(r#"{"type":"fork","forkBlock":100,"detectedBlock":90}"#).unwrap();
    for store in stores().await {
        let sink = StoreSink::new(store.clone(), reconciler(&store));
        assert!(matches!(
            sink.handle(&event).await,
            Err(StoreError::MalformedInput { .. })
        ));
    }
}

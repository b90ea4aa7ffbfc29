//! Query service behaviour shared by every backend.

mod common;

use common::*;
use relaystore_core::model::col;
use relaystore_core::query::{RecentFilter, TimeWindow, RECENT_LIMIT};
use relaystore_core::{CancelEvent, CutoffEvent, FieldFilter, FillEvent, QueryService, Record, StoreError, Value};

// ─── page_query ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_partition_the_ordered_result() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        for i in 0..7 {
            store
                .insert(&fill(100 + i, &format!("{:02x}", 0xa0 + i), "bb"))
                .await
                .unwrap();
        }

        let fields = FieldFilter::from([(col::MARKET.to_string(), Value::from("LRC-WETH"))]);
        let mut seen = Vec::new();
        for page_index in 1..=4 {
            let page = queries
                .page_query::<FillEvent>(&fields, page_index, 3)
                .await
                .unwrap();
            assert_eq!(page.total, 7);
            assert_eq!(page.page_index, page_index);
            seen.extend(page.data.iter().map(|f| f.block_number));
        }
        // newest first, no overlap or gap
        assert_eq!(seen, vec![106, 105, 104, 103, 102, 101, 100]);
    }
}

#[tokio::test]
async fn page_query_skips_forked_records_unless_asked() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        for (block, tx) in [(50, "c1"), (51, "c2"), (52, "c3")] {
            store.insert(&cancel(block, tx, "bb")).await.unwrap();
        }
        reconciler(&store).reconcile(51, 52).await.unwrap();

        let fields = FieldFilter::from([(col::ORDER_HASH.to_string(), Value::from(hash("bb")))]);
        let live = queries.page_query::<CancelEvent>(&fields, 1, 10).await.unwrap();
        assert_eq!(live.total, 2);

        let mut forked = fields.clone();
        forked.insert(col::FORK.to_string(), Value::Bool(true));
        let page = queries.page_query::<CancelEvent>(&forked, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].block_number, 52);
    }
}

#[tokio::test]
async fn page_query_rejects_bad_arguments() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        let none = FieldFilter::new();
        assert!(matches!(
            queries.page_query::<FillEvent>(&none, 0, 10).await,
            Err(StoreError::MalformedInput { .. })
        ));
        assert!(matches!(
            queries.page_query::<FillEvent>(&none, 1, 0).await,
            Err(StoreError::MalformedInput { .. })
        ));

        let unknown = FieldFilter::from([("nonsense".to_string(), Value::from(1i64))]);
        assert!(matches!(
            queries.page_query::<FillEvent>(&unknown, 1, 10).await,
            Err(StoreError::MalformedInput { .. })
        ));

        let wrong_type = FieldFilter::from([(col::BLOCK_NUMBER.to_string(), Value::from("100"))]);
        assert!(queries.page_query::<FillEvent>(&wrong_type, 1, 10).await.is_err());
    }
}

// ─── query_recent ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn recent_is_capped() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        for i in 0..(RECENT_LIMIT as i64 + 5) {
            store.insert(&cancel(i, &format!("{:02x}", i), "bb")).await.unwrap();
        }
        let recent = queries
            .query_recent::<CancelEvent>(&RecentFilter::default())
            .await
            .unwrap();
        assert_eq!(recent.len(), RECENT_LIMIT as usize);
        assert_eq!(recent[0].block_number, RECENT_LIMIT as i64 + 4);
    }
}

#[tokio::test]
async fn recent_time_window_bounds_are_independent() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        for block in [10, 20, 30] {
            store.insert(&fill(block, &format!("{block}"), "bb")).await.unwrap();
        }
        let t = |block: i64| 1_510_000_000 + block;
        let blocks = |v: Vec<FillEvent>| v.iter().map(|f| f.block_number).collect::<Vec<_>>();

        let cases = [
            (TimeWindow::new(None, None), vec![30, 20, 10]),
            (TimeWindow::new(Some(t(20)), None), vec![30, 20]),
            (TimeWindow::new(None, Some(t(20))), vec![20, 10]),
            (TimeWindow::new(Some(t(20)), Some(t(20))), vec![20]),
        ];
        for (window, expected) in cases {
            let filter = RecentFilter {
                window,
                ..Default::default()
            };
            let got = queries.query_recent::<FillEvent>(&filter).await.unwrap();
            assert_eq!(blocks(got), expected, "{window:?}");
        }
    }
}

#[tokio::test]
async fn recent_filters_on_market_and_owner() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        store.insert(&fill(10, "a1", "bb")).await.unwrap();
        let mut other = fill(11, "a2", "bb");
        other.market = "RDN-WETH".into();
        other.owner = OTHER_OWNER.into();
        store.insert(&other).await.unwrap();

        let by_market = RecentFilter {
            market: Some("RDN-WETH".into()),
            ..Default::default()
        };
        let got = queries.query_recent::<FillEvent>(&by_market).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].block_number, 11);

        // owner lookups are case-insensitive
        let by_owner = RecentFilter {
            owner: Some(OWNER.to_lowercase()),
            ..Default::default()
        };
        let got = queries.query_recent::<FillEvent>(&by_owner).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].block_number, 10);

        let none = RecentFilter {
            market: Some("ZRX-WETH".into()),
            ..Default::default()
        };
        assert!(queries.query_recent::<FillEvent>(&none).await.unwrap().is_empty());

        // cancels carry no market column
        assert!(matches!(
            queries.query_recent::<CancelEvent>(&by_market).await,
            Err(StoreError::MalformedInput { .. })
        ));
    }
}

// ─── Point lookups and templates ──────────────────────────────────────────────

#[tokio::test]
async fn latest_cutoff_falls_back_after_fork() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        store.insert(&cutoff(60, "e1", OWNER)).await.unwrap();
        store.insert(&cutoff(99, "e2", OWNER)).await.unwrap();
        store.insert(&cutoff(120, "e3", OTHER_OWNER)).await.unwrap();

        assert_eq!(queries.latest_cutoff(OWNER).await.unwrap().block_number, 99);

        reconciler(&store).reconcile(90, 100).await.unwrap();
        assert_eq!(queries.latest_cutoff(OWNER).await.unwrap().block_number, 60);

        let by_tx = queries.cutoff_by_tx_and_owner(&hash("e3"), OTHER_OWNER).await.unwrap();
        assert_eq!(by_tx.block_number, 120);

        let unknown = "0x0000000000000000000000000000000000000001";
        assert!(queries.latest_cutoff(unknown).await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn template_finders_and_update() {
    for store in stores().await {
        for (block, tx) in [(50, "c1"), (51, "c2"), (52, "c3")] {
            store.insert(&cancel(block, tx, "bb")).await.unwrap();
        }
        store.insert(&cancel(53, "c4", "dd")).await.unwrap();

        let template = CancelEvent {
            order_hash: hash("bb"),
            ..Default::default()
        };
        assert_eq!(store.find_first(&template).await.unwrap().block_number, 50);
        assert_eq!(store.find_last(&template).await.unwrap().block_number, 52);
        assert_eq!(store.find_all(&template).await.unwrap().len(), 3);

        let mut last = store.find_last(&template).await.unwrap();
        last.amount_cancelled = "7".into();
        store.update(&last).await.unwrap();
        let by_id = CancelEvent {
            id: last.id(),
            ..Default::default()
        };
        assert_eq!(store.find_first(&by_id).await.unwrap().amount_cancelled, "7");

        // id 0 inserts a new record
        let fresh = store.update(&cancel(60, "c9", "ee")).await.unwrap();
        assert!(fresh.id() > last.id());

        let missing = CancelEvent {
            order_hash: hash("ff"),
            ..Default::default()
        };
        let err = store.find_first(&missing).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }
}

#[tokio::test]
async fn cutoff_records_roundtrip_through_storage() {
    for store in stores().await {
        let rec = cutoff(77, "e7", OWNER);
        let stored = store.insert(&rec).await.unwrap();
        let back = store
            .find_first(&CutoffEvent {
                id: stored.id(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(back, stored);
    }
}

#[tokio::test]
async fn page_filters_ignore_hash_and_address_case() {
    for store in stores().await {
        let queries = QueryService::new(store.clone());
        store.insert(&fill(100, "aa", "bb")).await.unwrap();
        store.insert(&fill(101, "ab", "bc")).await.unwrap();

        let by_owner = FieldFilter::from([(col::OWNER.to_string(), Value::from(OWNER.to_lowercase()))]);
        let page = queries.page_query::<FillEvent>(&by_owner, 1, 10).await.unwrap();
        assert_eq!(page.total, 2, "{}", store.backend_name());

        let by_order = FieldFilter::from([(
            col::ORDER_HASH.to_string(),
            Value::from(format!("0x{}", "BC".repeat(32))),
        )]);
        let page = queries.page_query::<FillEvent>(&by_order, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].block_number, 101);
    }
}

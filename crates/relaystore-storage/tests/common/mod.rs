//! Shared fixtures for the storage integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use relaystore_core::{
    CancelEvent, CutoffEvent, FillEvent, PolicyTable, QueryService, RecordStore, Reconciler,
    StorageBackend,
};
use relaystore_storage::sqlite::SqliteBackend;
use relaystore_storage::InMemoryBackend;

pub const OWNER: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
pub const OTHER_OWNER: &str = "0x1111111111111111111111111111111111111111";

/// `0x` followed by `byte` repeated to 32 bytes.
pub fn hash(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

/// Every backend that runs without external services.
pub async fn backends() -> Vec<Arc<dyn StorageBackend>> {
    vec![
        Arc::new(InMemoryBackend::new()),
        Arc::new(SqliteBackend::in_memory().await.expect("sqlite in-memory")),
    ]
}

/// A fresh store on every backend that runs without external services.
pub async fn stores() -> Vec<RecordStore> {
    let mut out = Vec::new();
    for backend in backends().await {
        let store = RecordStore::new(backend, "lpr_");
        store.create_schema().await.expect("create schema");
        out.push(store);
    }
    out
}

pub fn reconciler(store: &RecordStore) -> Reconciler {
    Reconciler::new(QueryService::new(store.clone()), PolicyTable::default())
}

pub fn fill(block: i64, ring: &str, order: &str) -> FillEvent {
    FillEvent {
        protocol: OTHER_OWNER.into(),
        owner: OWNER.into(),
        ring_index: block,
        block_number: block,
        create_time: 1_510_000_000 + block,
        ring_hash: hash(ring),
        tx_hash: hash("f0"),
        pre_order_hash: hash("01"),
        next_order_hash: hash("02"),
        order_hash: hash(order),
        amount_s: "1000000000000000000000".into(),
        amount_b: "500000000000000000".into(),
        token_s: "0xEF68e7C694F40c8202821eDF525dE3782458639f".into(),
        token_b: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".into(),
        lrc_reward: "0".into(),
        lrc_fee: "1000000000000000000".into(),
        split_s: "0".into(),
        split_b: "0".into(),
        market: "LRC-WETH".into(),
        ..Default::default()
    }
}

pub fn cancel(block: i64, tx: &str, order: &str) -> CancelEvent {
    CancelEvent {
        protocol: OTHER_OWNER.into(),
        order_hash: hash(order),
        tx_hash: hash(tx),
        block_number: block,
        create_time: 1_510_000_000 + block,
        amount_cancelled: "100000000000000000000".into(),
        log_index: 0,
        ..Default::default()
    }
}

pub fn cutoff(block: i64, tx: &str, owner: &str) -> CutoffEvent {
    CutoffEvent {
        protocol: OTHER_OWNER.into(),
        owner: owner.into(),
        tx_hash: hash(tx),
        block_number: block,
        create_time: 1_510_000_000 + block,
        cutoff: 1_509_000_000 + block,
        log_index: 0,
        ..Default::default()
    }
}

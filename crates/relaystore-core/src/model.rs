//! Persisted record shapes, one per event kind.
//!
//! Column names are stable and independent of the Rust field names; the JSON
//! representation uses camelCase field names for downstream consumers.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::schema::{ColumnDef, Record, RecordKind, Row, TableSchema};

/// Stable column names.
pub mod col {
    pub const PROTOCOL: &str = "contract_address";
    pub const TX_HASH: &str = "tx_hash";
    pub const BLOCK_NUMBER: &str = "block_number";
    pub const CREATE_TIME: &str = "create_time";
    pub const LOG_INDEX: &str = "log_index";
    pub const FORK: &str = "fork";
    pub const OWNER: &str = "owner";
    pub const ORDER_HASH: &str = "order_hash";
    pub const RING_HASH: &str = "ring_hash";
    pub const RING_INDEX: &str = "ring_index";
    pub const FILL_INDEX: &str = "fill_index";
    pub const PRE_ORDER_HASH: &str = "pre_order_hash";
    pub const NEXT_ORDER_HASH: &str = "next_order_hash";
    pub const TOKEN_S: &str = "token_s";
    pub const TOKEN_B: &str = "token_b";
    pub const AMOUNT_S: &str = "amount_s";
    pub const AMOUNT_B: &str = "amount_b";
    pub const LRC_REWARD: &str = "lrc_reward";
    pub const LRC_FEE: &str = "lrc_fee";
    pub const SPLIT_S: &str = "split_s";
    pub const SPLIT_B: &str = "split_b";
    pub const MARKET: &str = "market";
    pub const AMOUNT_CANCELLED: &str = "amount_cancelled";
    pub const CUTOFF: &str = "cutoff";
}

/// Schemas of every known record kind, in creation order.
pub const ALL_SCHEMAS: [&TableSchema; 3] = [FillEvent::SCHEMA, CancelEvent::SCHEMA, CutoffEvent::SCHEMA];

pub fn schema_for(kind: RecordKind) -> &'static TableSchema {
    match kind {
        RecordKind::Fill => FillEvent::SCHEMA,
        RecordKind::Cancel => CancelEvent::SCHEMA,
        RecordKind::Cutoff => CutoffEvent::SCHEMA,
    }
}

// ─── FillEvent ────────────────────────────────────────────────────────────────

/// One matched leg of a ring settled on-chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillEvent {
    pub id: i64,
    pub protocol: String,
    pub owner: String,
    pub ring_index: i64,
    pub block_number: i64,
    pub create_time: i64,
    pub ring_hash: String,
    pub fill_index: i64,
    pub tx_hash: String,
    pub pre_order_hash: String,
    pub next_order_hash: String,
    pub order_hash: String,
    pub amount_s: String,
    pub amount_b: String,
    pub token_s: String,
    pub token_b: String,
    pub lrc_reward: String,
    pub lrc_fee: String,
    pub split_s: String,
    pub split_b: String,
    pub market: String,
    pub fork: bool,
}

impl Record for FillEvent {
    const SCHEMA: &'static TableSchema = &TableSchema {
        kind: RecordKind::Fill,
        table: "fill_events",
        columns: &[
            ColumnDef::text(col::PROTOCOL),
            ColumnDef::text(col::OWNER),
            ColumnDef::int(col::RING_INDEX),
            ColumnDef::int(col::BLOCK_NUMBER),
            ColumnDef::int(col::CREATE_TIME),
            ColumnDef::text(col::RING_HASH),
            ColumnDef::int(col::FILL_INDEX),
            ColumnDef::text(col::TX_HASH),
            ColumnDef::text(col::PRE_ORDER_HASH),
            ColumnDef::text(col::NEXT_ORDER_HASH),
            ColumnDef::text(col::ORDER_HASH),
            ColumnDef::text(col::AMOUNT_S),
            ColumnDef::text(col::AMOUNT_B),
            ColumnDef::text(col::TOKEN_S),
            ColumnDef::text(col::TOKEN_B),
            ColumnDef::text(col::LRC_REWARD),
            ColumnDef::text(col::LRC_FEE),
            ColumnDef::text(col::SPLIT_S),
            ColumnDef::text(col::SPLIT_B),
            ColumnDef::text(col::MARKET),
            ColumnDef::bool(col::FORK),
        ],
        unique_key: &[col::RING_HASH, col::ORDER_HASH],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn block_number(&self) -> i64 {
        self.block_number
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn is_forked(&self) -> bool {
        self.fork
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::PROTOCOL, self.protocol.as_str())
            .with(col::OWNER, self.owner.as_str())
            .with(col::RING_INDEX, self.ring_index)
            .with(col::BLOCK_NUMBER, self.block_number)
            .with(col::CREATE_TIME, self.create_time)
            .with(col::RING_HASH, self.ring_hash.as_str())
            .with(col::FILL_INDEX, self.fill_index)
            .with(col::TX_HASH, self.tx_hash.as_str())
            .with(col::PRE_ORDER_HASH, self.pre_order_hash.as_str())
            .with(col::NEXT_ORDER_HASH, self.next_order_hash.as_str())
            .with(col::ORDER_HASH, self.order_hash.as_str())
            .with(col::AMOUNT_S, self.amount_s.as_str())
            .with(col::AMOUNT_B, self.amount_b.as_str())
            .with(col::TOKEN_S, self.token_s.as_str())
            .with(col::TOKEN_B, self.token_b.as_str())
            .with(col::LRC_REWARD, self.lrc_reward.as_str())
            .with(col::LRC_FEE, self.lrc_fee.as_str())
            .with(col::SPLIT_S, self.split_s.as_str())
            .with(col::SPLIT_B, self.split_b.as_str())
            .with(col::MARKET, self.market.as_str())
            .with(col::FORK, self.fork)
    }

    fn from_row(id: i64, row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id,
            protocol: row.text(col::PROTOCOL)?,
            owner: row.text(col::OWNER)?,
            ring_index: row.int(col::RING_INDEX)?,
            block_number: row.int(col::BLOCK_NUMBER)?,
            create_time: row.int(col::CREATE_TIME)?,
            ring_hash: row.text(col::RING_HASH)?,
            fill_index: row.int(col::FILL_INDEX)?,
            tx_hash: row.text(col::TX_HASH)?,
            pre_order_hash: row.text(col::PRE_ORDER_HASH)?,
            next_order_hash: row.text(col::NEXT_ORDER_HASH)?,
            order_hash: row.text(col::ORDER_HASH)?,
            amount_s: row.text(col::AMOUNT_S)?,
            amount_b: row.text(col::AMOUNT_B)?,
            token_s: row.text(col::TOKEN_S)?,
            token_b: row.text(col::TOKEN_B)?,
            lrc_reward: row.text(col::LRC_REWARD)?,
            lrc_fee: row.text(col::LRC_FEE)?,
            split_s: row.text(col::SPLIT_S)?,
            split_b: row.text(col::SPLIT_B)?,
            market: row.text(col::MARKET)?,
            fork: row.bool(col::FORK)?,
        })
    }
}

// ─── CancelEvent ──────────────────────────────────────────────────────────────

/// Cancellation of part of an order's remaining volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEvent {
    pub id: i64,
    pub protocol: String,
    pub order_hash: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub create_time: i64,
    /// Amount cancelled by this event alone.
    pub amount_cancelled: String,
    pub log_index: i64,
    pub fork: bool,
}

impl Record for CancelEvent {
    const SCHEMA: &'static TableSchema = &TableSchema {
        kind: RecordKind::Cancel,
        table: "cancel_events",
        columns: &[
            ColumnDef::text(col::PROTOCOL),
            ColumnDef::text(col::ORDER_HASH),
            ColumnDef::text(col::TX_HASH),
            ColumnDef::int(col::BLOCK_NUMBER),
            ColumnDef::int(col::CREATE_TIME),
            ColumnDef::text(col::AMOUNT_CANCELLED),
            ColumnDef::int(col::LOG_INDEX),
            ColumnDef::bool(col::FORK),
        ],
        unique_key: &[col::TX_HASH, col::ORDER_HASH, col::LOG_INDEX],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn block_number(&self) -> i64 {
        self.block_number
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn is_forked(&self) -> bool {
        self.fork
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::PROTOCOL, self.protocol.as_str())
            .with(col::ORDER_HASH, self.order_hash.as_str())
            .with(col::TX_HASH, self.tx_hash.as_str())
            .with(col::BLOCK_NUMBER, self.block_number)
            .with(col::CREATE_TIME, self.create_time)
            .with(col::AMOUNT_CANCELLED, self.amount_cancelled.as_str())
            .with(col::LOG_INDEX, self.log_index)
            .with(col::FORK, self.fork)
    }

    fn from_row(id: i64, row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id,
            protocol: row.text(col::PROTOCOL)?,
            order_hash: row.text(col::ORDER_HASH)?,
            tx_hash: row.text(col::TX_HASH)?,
            block_number: row.int(col::BLOCK_NUMBER)?,
            create_time: row.int(col::CREATE_TIME)?,
            amount_cancelled: row.text(col::AMOUNT_CANCELLED)?,
            log_index: row.int(col::LOG_INDEX)?,
            fork: row.bool(col::FORK)?,
        })
    }
}

// ─── CutoffEvent ──────────────────────────────────────────────────────────────

/// An owner voiding every order created before `cutoff`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoffEvent {
    pub id: i64,
    pub protocol: String,
    pub owner: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub create_time: i64,
    /// Unix timestamp; orders created before it are void.
    pub cutoff: i64,
    pub log_index: i64,
    pub fork: bool,
}

impl Record for CutoffEvent {
    const SCHEMA: &'static TableSchema = &TableSchema {
        kind: RecordKind::Cutoff,
        table: "cutoff_events",
        columns: &[
            ColumnDef::text(col::PROTOCOL),
            ColumnDef::text(col::OWNER),
            ColumnDef::text(col::TX_HASH),
            ColumnDef::int(col::BLOCK_NUMBER),
            ColumnDef::int(col::CREATE_TIME),
            ColumnDef::int(col::CUTOFF),
            ColumnDef::int(col::LOG_INDEX),
            ColumnDef::bool(col::FORK),
        ],
        unique_key: &[col::TX_HASH, col::OWNER, col::LOG_INDEX],
    };

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn block_number(&self) -> i64 {
        self.block_number
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn is_forked(&self) -> bool {
        self.fork
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(col::PROTOCOL, self.protocol.as_str())
            .with(col::OWNER, self.owner.as_str())
            .with(col::TX_HASH, self.tx_hash.as_str())
            .with(col::BLOCK_NUMBER, self.block_number)
            .with(col::CREATE_TIME, self.create_time)
            .with(col::CUTOFF, self.cutoff)
            .with(col::LOG_INDEX, self.log_index)
            .with(col::FORK, self.fork)
    }

    fn from_row(id: i64, row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id,
            protocol: row.text(col::PROTOCOL)?,
            owner: row.text(col::OWNER)?,
            tx_hash: row.text(col::TX_HASH)?,
            block_number: row.int(col::BLOCK_NUMBER)?,
            create_time: row.int(col::CREATE_TIME)?,
            cutoff: row.int(col::CUTOFF)?,
            log_index: row.int(col::LOG_INDEX)?,
            fork: row.bool(col::FORK)?,
        })
    }
}

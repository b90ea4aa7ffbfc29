//! Decoded chain events as delivered by the ingestion feed.
//!
//! These carry full-width EVM primitives; the converter narrows them into
//! persisted records.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// `OrderFilled`: one order's leg of a mined ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilledEvent {
    pub ring_hash: B256,
    pub pre_order_hash: B256,
    pub order_hash: B256,
    pub next_order_hash: B256,
    pub tx_hash: B256,
    pub contract_address: Address,
    pub owner: Address,
    pub token_s: Address,
    pub token_b: Address,
    pub ring_index: U256,
    pub fill_index: U256,
    /// Block timestamp.
    pub time: U256,
    pub block_number: U256,
    pub amount_s: U256,
    pub amount_b: U256,
    pub lrc_reward: U256,
    pub lrc_fee: U256,
    pub split_s: U256,
    pub split_b: U256,
    /// Market label derived by the feed (e.g. `"LRC-WETH"`).
    pub market: String,
}

/// `OrderCancelled`: part of an order's remaining volume was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelledEvent {
    pub order_hash: B256,
    pub tx_hash: B256,
    pub contract_address: Address,
    pub time: U256,
    pub block_number: U256,
    pub amount_cancelled: U256,
    pub log_index: u64,
}

/// `CutoffTimestampChanged`: the owner voided all orders before `cutoff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutoffChangedEvent {
    pub owner: Address,
    pub tx_hash: B256,
    pub contract_address: Address,
    pub time: U256,
    pub block_number: U256,
    pub cutoff: U256,
    pub log_index: u64,
}

/// Emitted by the chain monitor when the canonical chain diverged.
///
/// Everything after `fork_block` up to and including `detected_block`
/// belongs to abandoned blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkNotice {
    /// Last block still known to be canonical.
    pub fork_block: u64,
    /// Height at which the divergence was observed.
    pub detected_block: u64,
}

/// One item of the ingestion feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChainEvent {
    OrderFilled(OrderFilledEvent),
    OrderCancelled(OrderCancelledEvent),
    Cutoff(CutoffChangedEvent),
    Fork(ForkNotice),
}

impl ChainEvent {
    /// Block the event belongs to (`detected_block` for fork notices).
    pub fn block_number(&self) -> U256 {
        match self {
            Self::OrderFilled(e) => e.block_number,
            Self::OrderCancelled(e) => e.block_number,
            Self::Cutoff(e) => e.block_number,
            Self::Fork(f) => U256::from(f.detected_block),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderFilled(_) => "OrderFilled",
            Self::OrderCancelled(_) => "OrderCancelled",
            Self::Cutoff(_) => "Cutoff",
            Self::Fork(_) => "Fork",
        }
    }
}

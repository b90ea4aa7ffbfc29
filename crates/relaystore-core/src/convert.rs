//! Decoded chain event → persisted record conversion.
//!
//! Addresses are rendered EIP-55 checksummed, hashes as lowercase `0x` hex,
//! amounts as base-10 text. Heights, timestamps and indexes must fit in an
//! `i64`; anything wider is rejected rather than truncated.

use alloy_primitives::{Address, B256, U256};

use crate::chain::{CutoffChangedEvent, OrderCancelledEvent, OrderFilledEvent};
use crate::error::StoreError;
use crate::model::{CancelEvent, CutoffEvent, FillEvent};

/// Canonical text form of an address.
pub fn address_text(addr: &Address) -> String {
    addr.to_checksum(None)
}

/// Canonical text form of a 32-byte hash.
pub fn hash_text(hash: &B256) -> String {
    format!("{hash:#x}")
}

/// Base-10 text form of an arbitrary-precision amount.
pub fn amount_text(amount: &U256) -> String {
    amount.to_string()
}

/// Narrow a 256-bit value to `i64`, naming the offending field on overflow.
pub fn narrow_u256(field: &str, value: &U256) -> Result<i64, StoreError> {
    let v = u64::try_from(*value)
        .map_err(|_| StoreError::malformed(field, format!("{value} does not fit in 64 bits")))?;
    narrow_u64(field, v)
}

pub fn narrow_u64(field: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::malformed(field, format!("{value} exceeds i64::MAX")))
}

/// Rewrite a caller-supplied hash or address into its stored form so lookups
/// are case-insensitive. Anything else passes through untouched.
pub fn canonical_key(raw: &str) -> String {
    let raw = raw.trim();
    match raw.len() {
        66 => raw.parse::<B256>().map(|h| hash_text(&h)).ok(),
        42 => raw.parse::<Address>().map(|a| address_text(&a)).ok(),
        _ => None,
    }
    .unwrap_or_else(|| raw.to_string())
}

impl TryFrom<&OrderFilledEvent> for FillEvent {
    type Error = StoreError;

    fn try_from(src: &OrderFilledEvent) -> Result<Self, Self::Error> {
        if src.market.trim().is_empty() {
            return Err(StoreError::malformed("market", "fill event carries no market label"));
        }

        Ok(Self {
            id: 0,
            protocol: address_text(&src.contract_address),
            owner: address_text(&src.owner),
            ring_index: narrow_u256("ringIndex", &src.ring_index)?,
            block_number: narrow_u256("blockNumber", &src.block_number)?,
            create_time: narrow_u256("time", &src.time)?,
            ring_hash: hash_text(&src.ring_hash),
            fill_index: narrow_u256("fillIndex", &src.fill_index)?,
            tx_hash: hash_text(&src.tx_hash),
            pre_order_hash: hash_text(&src.pre_order_hash),
            next_order_hash: hash_text(&src.next_order_hash),
            order_hash: hash_text(&src.order_hash),
            amount_s: amount_text(&src.amount_s),
            amount_b: amount_text(&src.amount_b),
            token_s: address_text(&src.token_s),
            token_b: address_text(&src.token_b),
            lrc_reward: amount_text(&src.lrc_reward),
            lrc_fee: amount_text(&src.lrc_fee),
            split_s: amount_text(&src.split_s),
            split_b: amount_text(&src.split_b),
            market: src.market.clone(),
            fork: false,
        })
    }
}

impl TryFrom<&OrderCancelledEvent> for CancelEvent {
    type Error = StoreError;

    fn try_from(src: &OrderCancelledEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            id: 0,
            protocol: address_text(&src.contract_address),
            order_hash: hash_text(&src.order_hash),
            tx_hash: hash_text(&src.tx_hash),
            block_number: narrow_u256("blockNumber", &src.block_number)?,
            create_time: narrow_u256("time", &src.time)?,
            amount_cancelled: amount_text(&src.amount_cancelled),
            log_index: narrow_u64("logIndex", src.log_index)?,
            fork: false,
        })
    }
}

impl TryFrom<&CutoffChangedEvent> for CutoffEvent {
    type Error = StoreError;

    fn try_from(src: &CutoffChangedEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            id: 0,
            protocol: address_text(&src.contract_address),
            owner: address_text(&src.owner),
            tx_hash: hash_text(&src.tx_hash),
            block_number: narrow_u256("blockNumber", &src.block_number)?,
            create_time: narrow_u256("time", &src.time)?,
            cutoff: narrow_u256("cutoff", &src.cutoff)?,
            log_index: narrow_u64("logIndex", src.log_index)?,
            fork: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn sample_fill() -> OrderFilledEvent {
        OrderFilledEvent {
            ring_hash: B256::repeat_byte(0xaa),
            pre_order_hash: B256::repeat_byte(0x01),
            order_hash: B256::repeat_byte(0xbb),
            next_order_hash: B256::repeat_byte(0x02),
            tx_hash: B256::repeat_byte(0xcc),
            contract_address: addr("0x8d8812b72d1e4ffcec158d25f56748b7d67c1e78"),
            owner: addr("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"),
            token_s: addr("0xef68e7c694f40c8202821edf525de3782458639f"),
            token_b: addr("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            ring_index: U256::from(12u64),
            fill_index: U256::from(1u64),
            time: U256::from(1_510_000_000u64),
            block_number: U256::from(100u64),
            amount_s: U256::MAX,
            amount_b: U256::from(10u64).pow(U256::from(30u64)),
            lrc_reward: U256::ZERO,
            lrc_fee: U256::from(5_000_000_000_000_000_000u128),
            split_s: U256::from(3u64),
            split_b: U256::ZERO,
            market: "LRC-WETH".into(),
        }
    }

    #[test]
    fn fill_fields_are_recovered() {
        let src = sample_fill();
        let rec = FillEvent::try_from(&src).unwrap();

        assert_eq!(rec.id, 0);
        assert!(!rec.fork);
        assert_eq!(rec.block_number, 100);
        assert_eq!(rec.create_time, 1_510_000_000);
        assert_eq!(rec.ring_index, 12);
        assert_eq!(rec.fill_index, 1);
        assert_eq!(rec.market, "LRC-WETH");

        assert_eq!(B256::from_str(&rec.ring_hash).unwrap(), src.ring_hash);
        assert_eq!(B256::from_str(&rec.order_hash).unwrap(), src.order_hash);
        assert_eq!(B256::from_str(&rec.pre_order_hash).unwrap(), src.pre_order_hash);
        assert_eq!(B256::from_str(&rec.next_order_hash).unwrap(), src.next_order_hash);
        assert_eq!(B256::from_str(&rec.tx_hash).unwrap(), src.tx_hash);
        assert_eq!(addr(&rec.owner), src.owner);
        assert_eq!(addr(&rec.protocol), src.contract_address);
        assert_eq!(addr(&rec.token_s), src.token_s);
        assert_eq!(addr(&rec.token_b), src.token_b);

        for (text, value) in [
            (&rec.amount_s, src.amount_s),
            (&rec.amount_b, src.amount_b),
            (&rec.lrc_reward, src.lrc_reward),
            (&rec.lrc_fee, src.lrc_fee),
            (&rec.split_s, src.split_s),
            (&rec.split_b, src.split_b),
        ] {
            assert_eq!(U256::from_str_radix(text, 10).unwrap(), value);
        }
    }

    #[test]
    fn amounts_beyond_u128_survive_as_decimal_text() {
        let rec = FillEvent::try_from(&sample_fill()).unwrap();
        assert_eq!(
            rec.amount_s,
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        assert_eq!(rec.amount_b, format!("1{}", "0".repeat(30)));
    }

    #[test]
    fn hashes_and_addresses_are_fixed_width() {
        let rec = FillEvent::try_from(&sample_fill()).unwrap();
        assert_eq!(rec.ring_hash, format!("0x{}", "aa".repeat(32)));
        assert_eq!(rec.ring_hash.len(), 66);
        assert_eq!(rec.owner.len(), 42);
        // EIP-55 checksum casing
        assert_eq!(rec.owner, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    }

    #[test]
    fn oversized_block_number_is_rejected() {
        let mut src = sample_fill();
        src.block_number = U256::from(u64::MAX);
        let err = FillEvent::try_from(&src).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInput { ref field, .. } if field == "blockNumber"));

        src.block_number = U256::from(1u128 << 80);
        assert!(FillEvent::try_from(&src).is_err());
    }

    #[test]
    fn missing_market_is_rejected() {
        let mut src = sample_fill();
        src.market = "  ".into();
        let err = FillEvent::try_from(&src).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInput { ref field, .. } if field == "market"));
    }

    #[test]
    fn canonical_key_normalises_case() {
        let upper = format!("0x{}", "AB".repeat(32));
        assert_eq!(canonical_key(&upper), format!("0x{}", "ab".repeat(32)));
        assert_eq!(
            canonical_key("0xD8DA6BF26964AF9D7EED9E03E53415D37AA96045"),
            "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
        );
        assert_eq!(canonical_key("LRC-WETH"), "LRC-WETH");
        assert_eq!(canonical_key("0xbb"), "0xbb");
    }

    #[test]
    fn cancel_conversion() {
        let src = OrderCancelledEvent {
            order_hash: B256::repeat_byte(0xbb),
            tx_hash: B256::repeat_byte(0xcc),
            contract_address: addr("0x8d8812b72d1e4ffcec158d25f56748b7d67c1e78"),
            time: U256::from(1_510_000_100u64),
            block_number: U256::from(51u64),
            amount_cancelled: U256::from(10u64).pow(U256::from(40u64)),
            log_index: 4,
        };
        let rec = CancelEvent::try_from(&src).unwrap();
        assert_eq!(rec.block_number, 51);
        assert_eq!(rec.log_index, 4);
        assert_eq!(U256::from_str_radix(&rec.amount_cancelled, 10).unwrap(), src.amount_cancelled);
        assert_eq!(B256::from_str(&rec.order_hash).unwrap(), src.order_hash);
        assert!(!rec.fork);
    }

    #[test]
    fn cutoff_conversion_rejects_huge_log_index() {
        let src = CutoffChangedEvent {
            owner: addr("0xd8da6bf26964af9d7eed9e03e53415d37aa96045"),
            tx_hash: B256::repeat_byte(0x11),
            contract_address: addr("0x8d8812b72d1e4ffcec158d25f56748b7d67c1e78"),
            time: U256::from(1_510_000_200u64),
            block_number: U256::from(60u64),
            cutoff: U256::from(1_509_999_999u64),
            log_index: u64::MAX,
        };
        assert!(CutoffEvent::try_from(&src).is_err());

        let ok = CutoffChangedEvent { log_index: 0, ..src };
        let rec = CutoffEvent::try_from(&ok).unwrap();
        assert_eq!(rec.cutoff, 1_509_999_999);
        assert_eq!(rec.owner, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    }
}

use derive_more::{Display, From};
use posttrade_instrument::{
    Side, account::AccountId, calendar::BusinessDate, instrument::name::InstrumentId,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::{SmolStr, format_smolstr};
use std::borrow::Borrow;

/// Execution identifier assigned by the upstream execution feed.
///
/// Also the feed dedupe key - see the inbound adapter.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct ExecId(pub SmolStr);

impl ExecId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ExecId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for ExecId {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

/// Order identifier assigned by the upstream order entry system.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct OrderId(pub SmolStr);

impl OrderId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Block trade identifier, derived deterministically from the aggregation bucket.
///
/// Stable across fills: every execution for the same (instrument, side, trade date) group
/// re-derives the same `BlockId`, so re-aggregation upserts the same row.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct BlockId(pub SmolStr);

impl BlockId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    /// Derive the identifier of the (instrument, side, trade date) aggregation bucket.
    pub fn derive(instrument: &InstrumentId, side: Side, trade_date: BusinessDate) -> Self {
        Self(format_smolstr!(
            "blk-{}",
            digest_tag(&[
                instrument.as_ref(),
                side.as_str(),
                &trade_date.to_string()
            ])
        ))
    }
}

/// Allocation identifier, derived deterministically from (block, account).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct AllocId(pub SmolStr);

impl AllocId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn derive(block: &BlockId, account: &AccountId) -> Self {
        Self(format_smolstr!(
            "alc-{}",
            digest_tag(&[block.0.as_str(), account.as_ref()])
        ))
    }
}

/// Settlement instruction identifier, derived deterministically from the allocation.
///
/// Doubles as the gateway `Idempotency-Key`, so a re-sent instruction is absorbed downstream.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct SettleId(pub SmolStr);

impl SettleId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn derive(alloc: &AllocId) -> Self {
        Self(format_smolstr!("stl-{}", digest_tag(&[alloc.0.as_str()])))
    }
}

/// Identifier of a published `TradeEvents` envelope - the publisher dedupe key.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct EventId(pub SmolStr);

impl EventId {
    pub fn derive(event_type: &'static str, parts: &[&str]) -> Self {
        let mut all = Vec::with_capacity(parts.len() + 1);
        all.push(event_type);
        all.extend_from_slice(parts);
        Self(format_smolstr!("evt-{}", digest_tag(&all)))
    }
}

/// 16-hex-char tag of the SHA-256 digest over `|`-joined parts.
///
/// Short enough that prefixed identifiers stay within `SmolStr`'s 23-byte inline capacity.
fn digest_tag(parts: &[&str]) -> SmolStr {
    let mut hasher = Sha256::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update([b'|']);
        }
        hasher.update(part.as_bytes());
    }

    let digest = hasher.finalize();
    SmolStr::new(hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> (InstrumentId, Side, BusinessDate) {
        (
            InstrumentId::new("inst-1"),
            Side::Buy,
            BusinessDate::from_yyyymmdd(20240115).unwrap(),
        )
    }

    #[test]
    fn test_block_id_pure_and_stable() {
        let (instrument, side, date) = bucket();
        let first = BlockId::derive(&instrument, side, date);
        let second = BlockId::derive(&instrument, side, date);
        assert_eq!(first, second);
    }

    #[test]
    fn test_block_id_distinct_per_bucket() {
        let (instrument, side, date) = bucket();
        let base = BlockId::derive(&instrument, side, date);

        assert_ne!(
            base,
            BlockId::derive(&InstrumentId::new("inst-2"), side, date)
        );
        assert_ne!(base, BlockId::derive(&instrument, Side::Sell, date));
        assert_ne!(
            base,
            BlockId::derive(
                &instrument,
                side,
                BusinessDate::from_yyyymmdd(20240116).unwrap()
            )
        );
    }

    #[test]
    fn test_alloc_and_settle_id_chain_stable() {
        let (instrument, side, date) = bucket();
        let block = BlockId::derive(&instrument, side, date);
        let account = AccountId::new("acct-1");

        let alloc = AllocId::derive(&block, &account);
        assert_eq!(alloc, AllocId::derive(&block, &account));

        let settle = SettleId::derive(&alloc);
        assert_eq!(settle, SettleId::derive(&alloc));
        assert_ne!(settle.0, alloc.0);
    }

    #[test]
    fn test_derived_ids_fit_smolstr_inline() {
        let (instrument, side, date) = bucket();
        let block = BlockId::derive(&instrument, side, date);
        assert!(block.0.len() <= 23);
    }
}

use crate::{
    allocation::Allocation,
    block::BlockTrade,
    fill::Execution,
    id::{AllocId, BlockId, EventId, ExecId, OrderId, SettleId},
    settlement::SettlementInstruction,
};
use posttrade_instrument::{account::AccountId, instrument::name::Mic};
use derive_more::From;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Schema version of every payload currently published on `TradeEvents`.
pub const SCHEMA_VERSION: u32 = 1;

/// Canonical business event envelope published on the `TradeEvents` topic.
///
/// `event_id` is a pure function of the payload's natural key, so a replayed rule re-derives
/// the same envelope and the publisher can deduplicate.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub schema_version: u32,
    #[serde(flatten)]
    pub kind: TradeEventKind,
}

impl EventEnvelope {
    pub fn new<K>(kind: K) -> Self
    where
        K: Into<TradeEventKind>,
    {
        let kind = kind.into();
        Self {
            event_id: kind.derive_event_id(),
            schema_version: SCHEMA_VERSION,
            kind,
        }
    }
}

/// Business event payloads, tagged on the wire as `{eventType, payload}`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, From)]
#[serde(tag = "eventType", content = "payload")]
pub enum TradeEventKind {
    ExecutionReceived(ExecutionReceived),
    BlockReady(BlockReady),
    AllocationCreated(AllocationCreated),
    SettlementSent(SettlementSent),
}

impl TradeEventKind {
    /// Derive the envelope identifier from the payload natural key.
    ///
    /// `BlockReady` and `AllocationCreated` key on the derived values as well as the row, so
    /// each re-aggregation of the same block is a distinct (separately published) event, while
    /// a replayed identical one is deduplicated.
    fn derive_event_id(&self) -> EventId {
        match self {
            TradeEventKind::ExecutionReceived(event) => {
                EventId::derive("ExecutionReceived", &[event.exec_id.0.as_str()])
            }
            TradeEventKind::BlockReady(event) => EventId::derive(
                "BlockReady",
                &[
                    event.block_id.0.as_str(),
                    &event.gross_qty.to_string(),
                    &event.avg_price.to_string(),
                ],
            ),
            TradeEventKind::AllocationCreated(event) => EventId::derive(
                "AllocationCreated",
                &[event.alloc_id.0.as_str(), &event.alloc_qty.to_string()],
            ),
            TradeEventKind::SettlementSent(event) => {
                EventId::derive("SettlementSent", &[event.settle_id.0.as_str()])
            }
        }
    }
}

/// `ExecutionReceived.v1` - a fill passed ingest validation.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceived {
    pub exec_id: ExecId,
    pub order_id: OrderId,
    pub qty: Decimal,
    pub price: Decimal,
    pub venue: Mic,
}

impl From<&Execution> for ExecutionReceived {
    fn from(execution: &Execution) -> Self {
        Self {
            exec_id: execution.exec_id.clone(),
            order_id: execution.order_id.clone(),
            qty: execution.qty,
            price: execution.price,
            venue: execution.venue.clone(),
        }
    }
}

/// `BlockReady.v1` - a block (re-)aggregated and ready for allocation.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReady {
    pub block_id: BlockId,
    pub gross_qty: Decimal,
    pub avg_price: Decimal,
}

impl From<&BlockTrade> for BlockReady {
    fn from(block: &BlockTrade) -> Self {
        Self {
            block_id: block.block_id.clone(),
            gross_qty: block.gross_qty,
            avg_price: block.avg_price,
        }
    }
}

/// `AllocationCreated.v1` - a per-account slice written for an allocated block.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationCreated {
    pub alloc_id: AllocId,
    pub block_id: BlockId,
    pub account_id: AccountId,
    pub alloc_qty: Decimal,
}

impl From<&Allocation> for AllocationCreated {
    fn from(allocation: &Allocation) -> Self {
        Self {
            alloc_id: allocation.alloc_id.clone(),
            block_id: allocation.block_id.clone(),
            account_id: allocation.account_id.clone(),
            alloc_qty: allocation.alloc_qty,
        }
    }
}

/// `SettlementSent.v1` - the gateway accepted a settlement instruction.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSent {
    pub settle_id: SettleId,
    pub alloc_id: AllocId,
}

impl From<&SettlementInstruction> for SettlementSent {
    fn from(instruction: &SettlementInstruction) -> Self {
        Self {
            settle_id: instruction.settle_id.clone(),
            alloc_id: instruction.alloc_id.clone(),
        }
    }
}

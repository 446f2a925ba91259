use crate::id::BlockId;
use posttrade_instrument::{Side, calendar::BusinessDate, instrument::name::InstrumentId};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Lifecycle of a [`BlockTrade`].
///
/// `Open` exists only transiently inside the aggregation rule - every committed aggregation
/// leaves the block `ReadyToAllocate`. `Busted` is terminal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Open,
    ReadyToAllocate,
    Allocated,
    Busted,
}

impl Display for BlockStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BlockStatus::Open => "OPEN",
                BlockStatus::ReadyToAllocate => "READY_TO_ALLOCATE",
                BlockStatus::Allocated => "ALLOCATED",
                BlockStatus::Busted => "BUSTED",
            }
        )
    }
}

/// Aggregated block trade parent for an (instrument, side, trade date) group of fills.
///
/// `gross_qty` and `avg_price` are a pure function of the group's live executions - the
/// aggregation rule recomputes them from scratch on every fill rather than incrementally, so
/// replays and bust-induced updates converge to the same row.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct BlockTrade {
    pub block_id: BlockId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub trade_date: BusinessDate,
    pub gross_qty: Decimal,
    pub avg_price: Decimal,
    pub status: BlockStatus,
}

impl BlockTrade {
    /// True while the block can still accept the outcome of an allocation pass.
    pub fn is_allocatable(&self) -> bool {
        self.status == BlockStatus::ReadyToAllocate
    }
}

impl Display for BlockTrade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ block: {}, instrument: {}, side: {}, date: {}, gross: {}, avg: {}, status: {} }}",
            self.block_id,
            self.instrument_id,
            self.side,
            self.trade_date,
            self.gross_qty,
            self.avg_price,
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BlockStatus::ReadyToAllocate).unwrap(),
            "\"READY_TO_ALLOCATE\""
        );
        assert_eq!(
            serde_json::from_str::<BlockStatus>("\"BUSTED\"").unwrap(),
            BlockStatus::Busted
        );
    }
}

use crate::id::{AllocId, BlockId};
use posttrade_instrument::account::AccountId;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Per-account slice of an allocated block trade.
///
/// Immutable once created - a bust propagates through the parent block's status, never by
/// mutating allocations.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Allocation {
    pub alloc_id: AllocId,
    pub block_id: BlockId,
    pub account_id: AccountId,
    pub alloc_qty: Decimal,
    pub alloc_price: Decimal,
}

impl Display for Allocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ alloc: {}, block: {}, account: {}, qty: {}, price: {} }}",
            self.alloc_id, self.block_id, self.account_id, self.alloc_qty, self.alloc_price
        )
    }
}

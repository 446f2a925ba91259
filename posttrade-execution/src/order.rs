use crate::id::OrderId;
use posttrade_instrument::{
    Side,
    account::{AccountId, TraderId},
    instrument::name::InstrumentId,
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Client order intent.
///
/// Created externally (order entry) and seeded into the pipeline as reference data; every
/// ingested execution must resolve to exactly one `Order`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Order {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub qty: Decimal,
    pub trader: TraderId,
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ order: {}, account: {}, instrument: {}, side: {}, qty: {} }}",
            self.order_id, self.account_id, self.instrument_id, self.side, self.qty
        )
    }
}

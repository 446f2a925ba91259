use crate::id::{ExecId, OrderId};
use posttrade_instrument::{
    calendar::BusinessDate,
    instrument::name::{InstrumentId, Mic},
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A realised fill reported by the execution feed.
///
/// Inserted by ingest; `qty` is mutated only by a bust correction (qty forced to zero), which
/// the bust rule observes through the store's update notification.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub exec_id: ExecId,
    pub order_id: OrderId,
    pub instrument_id: InstrumentId,
    pub qty: Decimal,
    pub price: Decimal,
    pub trade_date: BusinessDate,
    pub venue: Mic,
}

impl Execution {
    /// A fill participates in block aggregation only while its quantity is strictly positive;
    /// a busted fill (qty forced to zero) drops out of every aggregate.
    pub fn is_live(&self) -> bool {
        self.qty > Decimal::ZERO
    }
}

impl Display for Execution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ exec: {}, order: {}, instrument: {}, qty: {}, price: {}, date: {} }}",
            self.exec_id, self.order_id, self.instrument_id, self.qty, self.price, self.trade_date
        )
    }
}

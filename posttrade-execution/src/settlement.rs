use crate::id::{AllocId, SettleId};
use posttrade_instrument::{account::AccountId, calendar::BusinessDate, instrument::name::Isin};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Settlement method instructed to the downstream gateway.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettleMethod {
    /// Delivery Versus Payment.
    Dvp,
    /// Free Of Payment.
    Fop,
}

impl Display for SettleMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SettleMethod::Dvp => "DVP",
                SettleMethod::Fop => "FOP",
            }
        )
    }
}

/// Outbound settlement instruction for one allocation.
///
/// Materialised and sent, never stored as a pipeline table - the deterministic `settle_id`
/// (also the gateway idempotency key) makes a re-materialised instruction equivalent.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct SettlementInstruction {
    pub settle_id: SettleId,
    pub alloc_id: AllocId,
    pub account_id: AccountId,
    pub isin: Isin,
    pub settle_date: BusinessDate,
    pub method: SettleMethod,
    pub cash_amount: Decimal,
}

impl Display for SettlementInstruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ settle: {}, alloc: {}, account: {}, date: {}, method: {}, cash: {} }}",
            self.settle_id,
            self.alloc_id,
            self.account_id,
            self.settle_date,
            self.method,
            self.cash_amount
        )
    }
}

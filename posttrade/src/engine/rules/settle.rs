use crate::{
    engine::{Engine, EngineOutput, rules::RuleStep},
    error::RuleError,
    outbox::Effect,
};
use posttrade_execution::{
    allocation::Allocation,
    id::SettleId,
    money::notional,
    settlement::{SettleMethod, SettlementInstruction},
};

/// Settlement lag in business days (T+2).
pub const SETTLE_LAG_DAYS: u32 = 2;

impl Engine {
    /// GenerateSettlement - materialise a settlement instruction for a created allocation and
    /// stage it for the gateway.
    ///
    /// The instrument is resolved via the allocation's block (the block carries the
    /// `instrument_id`); `settle_date` is trade date + 2 business days on the configured
    /// calendar, and `cash_amount` rounds half-even at the instrument currency scale.
    ///
    /// Effect-only: the instruction is not a pipeline table. `SettlementSent` is published by
    /// the outbox dispatcher once the gateway acks.
    pub(crate) fn generate_settlement(
        &mut self,
        allocation: &Allocation,
    ) -> Result<RuleStep, RuleError> {
        let (trade_date, isin, scale) = {
            let tables = self.store.read();

            let block = tables.block(&allocation.block_id).ok_or_else(|| {
                RuleError::MissingReference(format!(
                    "block {} for allocation {}",
                    allocation.block_id, allocation.alloc_id
                ))
            })?;

            let instrument = tables.instrument(&block.instrument_id).ok_or_else(|| {
                RuleError::MissingReference(format!(
                    "instrument {} for block {}",
                    block.instrument_id, block.block_id
                ))
            })?;

            (
                block.trade_date,
                instrument.isin.clone(),
                self.scales.scale_of(&instrument.currency),
            )
        };

        let instruction = SettlementInstruction::new(
            SettleId::derive(&allocation.alloc_id),
            allocation.alloc_id.clone(),
            allocation.account_id.clone(),
            isin,
            self.calendar.add_business_days(trade_date, SETTLE_LAG_DAYS),
            SettleMethod::Dvp,
            notional(allocation.alloc_qty, allocation.alloc_price, scale),
        );

        Ok(RuleStep {
            outputs: vec![EngineOutput::SettlementStaged(
                instruction.settle_id.clone(),
            )],
            effects: vec![Effect::SendSettlement(instruction)],
            store_events: Vec::new(),
        })
    }
}

use crate::{
    engine::{Engine, EngineOutput, rules::RuleStep, rules::ingest},
    error::RuleError,
};
use posttrade_execution::{block::BlockStatus, fill::Execution, id::ExecId};
use rust_decimal::Decimal;
use tracing::info;

impl Engine {
    /// Apply an operator bust correction, forcing the execution quantity down.
    ///
    /// The store's execution-updated notification then drives [`Self::handle_bust`] within the
    /// same cascade.
    pub(crate) fn apply_correction(
        &mut self,
        exec_id: &ExecId,
        qty: Decimal,
    ) -> Result<RuleStep, RuleError> {
        let mut txn = self.store.begin();

        let Some(mut execution) = txn.execution(exec_id) else {
            return Err(RuleError::MissingReference(format!("execution {exec_id}")));
        };

        execution.qty = qty;
        txn.upsert_execution(execution);
        let store_events = txn.commit();

        Ok(RuleStep {
            outputs: vec![EngineOutput::CorrectionApplied(exec_id.clone())],
            effects: Vec::new(),
            store_events,
        })
    }

    /// HandleBust - an execution quantity dropped to zero (or below).
    ///
    /// Locates the affected block, scoped by instrument AND trade date AND the parent order's
    /// side (instrument alone is not unique across trade dates), re-aggregates it over the
    /// remaining live fills, and transitions it to `Busted`. A busted block is inert to
    /// allocation; already-sent settlement instructions are not retracted.
    pub(crate) fn handle_bust(&mut self, execution: &Execution) -> Result<RuleStep, RuleError> {
        let mut txn = self.store.begin();

        let order = txn.order(&execution.order_id).map_err(|_| {
            RuleError::MissingReference(format!(
                "order {} for busted execution {}",
                execution.order_id, execution.exec_id
            ))
        })?;

        let affected = txn.single_block_where(|block| {
            block.instrument_id == execution.instrument_id
                && block.trade_date == execution.trade_date
                && block.side == order.side
        })?;

        let Some(mut block) = affected else {
            return Ok(RuleStep::noop(EngineOutput::BustIgnored(
                execution.exec_id.clone(),
            )));
        };

        let instrument = txn.instrument(&execution.instrument_id).map_err(|_| {
            RuleError::MissingReference(format!(
                "instrument {} for block {}",
                execution.instrument_id, block.block_id
            ))
        })?;

        // Keep the block a pure function of its live fills, then pin it Busted
        let fills = txn.executions_where(|fill| {
            fill.instrument_id == execution.instrument_id
                && fill.trade_date == execution.trade_date
                && fill.is_live()
        });
        let scale = self.scales.scale_of(&instrument.currency);
        let (gross_qty, avg_price) = ingest::aggregate(&fills, scale);

        info!(
            block_id = %block.block_id,
            exec_id = %execution.exec_id,
            %gross_qty,
            "block busted"
        );

        block.gross_qty = gross_qty;
        block.avg_price = avg_price;
        block.status = BlockStatus::Busted;
        let block_id = block.block_id.clone();
        txn.upsert_block(block);

        let store_events = txn.commit();

        Ok(RuleStep {
            outputs: vec![EngineOutput::BlockBusted(block_id)],
            effects: Vec::new(),
            store_events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AuditOutcome, Processor, test_utils};
    use crate::error::DeadLetter;
    use posttrade_instrument::Side;
    use rust_decimal_macros::dec;

    fn rig_with_two_fills() -> test_utils::TestRig {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        rig.engine.process(test_utils::feed_fill(
            0,
            test_utils::fill("X1", "O1", dec!(60), dec!(10.00), 20240115),
        ));
        rig.engine.process(test_utils::feed_fill(
            1,
            test_utils::fill("X2", "O1", dec!(40), dec!(11.00), 20240115),
        ));

        rig
    }

    #[test]
    fn test_bust_transitions_block_and_reaggregates() {
        let mut rig = rig_with_two_fills();

        let audit = rig
            .engine
            .process(test_utils::feed_correction(2, "X1", dec!(0)));
        assert!(matches!(audit.outcome, AuditOutcome::Processed(_)));

        let tables = rig.engine.store.read();
        let block = tables.blocks.values().next().unwrap();

        assert_eq!(block.status, BlockStatus::Busted);
        assert_eq!(block.gross_qty, dec!(40));
        assert_eq!(block.avg_price, dec!(11.00));
        assert_eq!(
            tables
                .execution(&ExecId::new("X1"))
                .unwrap()
                .qty,
            dec!(0)
        );
    }

    #[test]
    fn test_busted_block_inert_to_allocation() {
        let mut rig = rig_with_two_fills();
        rig.engine
            .process(test_utils::feed_correction(2, "X1", dec!(0)));

        let block_ready = {
            let tables = rig.engine.store.read();
            posttrade_execution::event::BlockReady::from(tables.blocks.values().next().unwrap())
        };

        let audit = rig.engine.process(crate::PipelineEvent::TradeEvent(
            posttrade_execution::event::EventEnvelope::new(block_ready),
        ));

        assert!(matches!(
            audit.outcome,
            AuditOutcome::Processed(ref outputs)
                if matches!(outputs.as_slice(), [EngineOutput::BlockSkipped(_)])
        ));
    }

    #[test]
    fn test_correction_for_unknown_execution_dead_letters() {
        let mut rig = test_utils::rig(vec![]);

        let audit = rig
            .engine
            .process(test_utils::feed_correction(0, "X-missing", dec!(0)));

        assert!(matches!(
            audit.outcome,
            AuditOutcome::DeadLettered(RuleError::MissingReference(_))
        ));
        assert!(matches!(
            rig.dead_letters.try_next(),
            Some(DeadLetter::Correction { .. })
        ));
    }

    #[test]
    fn test_bust_with_no_block_is_ignored() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        // Seed an execution directly, without its block
        {
            let mut txn = rig.engine.store.begin();
            txn.upsert_execution(test_utils::fill("X1", "O1", dec!(100), dec!(10.00), 20240115));
            txn.commit();
        }

        let audit = rig
            .engine
            .process(test_utils::feed_correction(0, "X1", dec!(0)));

        assert!(matches!(
            audit.outcome,
            AuditOutcome::Processed(ref outputs)
                if outputs.contains(&EngineOutput::BustIgnored(ExecId::new("X1")))
        ));
    }
}

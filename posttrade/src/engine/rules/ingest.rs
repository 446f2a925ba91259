use crate::{
    engine::{Engine, EngineOutput, rules::RuleStep},
    error::RuleError,
    outbox::Effect,
    store::StoreTransaction,
};
use posttrade_execution::{
    block::{BlockStatus, BlockTrade},
    event::{BlockReady, EventEnvelope, ExecutionReceived},
    fill::Execution,
    id::BlockId,
    money::round_to_scale,
    order::Order,
};
use posttrade_instrument::instrument::Instrument;
use rust_decimal::Decimal;

impl Engine {
    /// IngestExecution chained with BuildBlockTrades, in one transaction.
    ///
    /// Upserts the fill by `exec_id`, resolves its parent order, re-aggregates the
    /// (instrument, side, trade date) block from scratch over all live fills, and leaves the
    /// block `ReadyToAllocate`. Idempotent on `exec_id`: a replayed fill re-derives identical
    /// rows and commits no change.
    pub(crate) fn ingest_fill(&mut self, execution: &Execution) -> Result<RuleStep, RuleError> {
        if execution.qty <= Decimal::ZERO {
            return Err(RuleError::Validation("execution qty must be strictly positive"));
        }
        if execution.price <= Decimal::ZERO {
            return Err(RuleError::Validation(
                "execution price must be strictly positive",
            ));
        }

        let mut txn = self.store.begin();

        // Resolve the parent order - fatal for this message if absent
        let order = txn.order(&execution.order_id).map_err(|_| {
            RuleError::MissingReference(format!(
                "order {} for execution {}",
                execution.order_id, execution.exec_id
            ))
        })?;

        let instrument = txn.instrument(&execution.instrument_id).map_err(|_| {
            RuleError::MissingReference(format!(
                "instrument {} for execution {}",
                execution.instrument_id, execution.exec_id
            ))
        })?;

        txn.upsert_execution(execution.clone());

        let block = self.build_block(&txn, execution, &order, &instrument)?;
        let block_id = block.block_id.clone();
        let block_ready = BlockReady::from(&block);
        txn.upsert_block(block);

        let store_events = txn.commit();

        Ok(RuleStep {
            outputs: vec![
                EngineOutput::ExecutionIngested(execution.exec_id.clone()),
                EngineOutput::BlockAggregated(block_id),
            ],
            effects: vec![
                Effect::Publish(EventEnvelope::new(ExecutionReceived::from(execution))),
                Effect::Publish(EventEnvelope::new(block_ready)),
            ],
            store_events,
        })
    }

    /// Locate the unique open aggregation bucket for the fill (or derive a fresh deterministic
    /// block id) and recompute its aggregates over all current live fills.
    fn build_block(
        &self,
        txn: &StoreTransaction<'_>,
        execution: &Execution,
        order: &Order,
        instrument: &Instrument,
    ) -> Result<BlockTrade, RuleError> {
        let existing = txn.single_block_where(|block| {
            block.instrument_id == execution.instrument_id
                && block.side == order.side
                && block.trade_date == execution.trade_date
                && matches!(
                    block.status,
                    BlockStatus::Open | BlockStatus::ReadyToAllocate
                )
        })?;

        let block_id = existing.map(|block| block.block_id).unwrap_or_else(|| {
            BlockId::derive(&execution.instrument_id, order.side, execution.trade_date)
        });

        let fills = txn.executions_where(|fill| {
            fill.instrument_id == execution.instrument_id
                && fill.trade_date == execution.trade_date
                && fill.is_live()
        });

        let scale = self.scales.scale_of(&instrument.currency);
        let (gross_qty, avg_price) = aggregate(&fills, scale);

        Ok(BlockTrade::new(
            block_id,
            execution.instrument_id.clone(),
            order.side,
            execution.trade_date,
            gross_qty,
            avg_price,
            BlockStatus::ReadyToAllocate,
        ))
    }
}

/// Quantity-weighted aggregates over a set of live fills: `gross = Σqty`,
/// `avg = round(Σ(qty·price) / Σqty)` half-even at the currency scale.
pub(crate) fn aggregate(fills: &[Execution], scale: u32) -> (Decimal, Decimal) {
    let gross_qty: Decimal = fills.iter().map(|fill| fill.qty).sum();
    if gross_qty.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }

    let notional: Decimal = fills.iter().map(|fill| fill.qty * fill.price).sum();
    (gross_qty, round_to_scale(notional / gross_qty, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        PipelineEvent,
        engine::{AuditOutcome, Processor, test_utils},
        error::DeadLetter,
    };
    use posttrade_instrument::Side;
    use rust_decimal_macros::dec;

    #[test]
    fn test_aggregate_two_fills_weighted_average() {
        let fills = vec![
            test_utils::fill("X1", "O1", dec!(60), dec!(10.00), 20240115),
            test_utils::fill("X2", "O1", dec!(40), dec!(11.00), 20240115),
        ];

        let (gross, avg) = aggregate(&fills, 2);
        assert_eq!(gross, dec!(100));
        assert_eq!(avg, dec!(10.40));
    }

    #[test]
    fn test_aggregate_skips_nothing_when_all_live() {
        let fills = vec![test_utils::fill("X1", "O1", dec!(100), dec!(10.00), 20240115)];
        assert_eq!(aggregate(&fills, 2), (dec!(100), dec!(10.00)));
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate(&[], 2), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn test_ingest_creates_execution_and_ready_block() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        let audit = rig.engine.process(test_utils::feed_fill(
            0,
            test_utils::fill("X1", "O1", dec!(100), dec!(10.00), 20240115),
        ));

        assert!(matches!(audit.outcome, AuditOutcome::Processed(_)));

        let tables = rig.engine.store.read();
        assert_eq!(tables.executions.len(), 1);

        let block = tables.blocks.values().next().unwrap();
        assert_eq!(block.gross_qty, dec!(100));
        assert_eq!(block.avg_price, dec!(10.00));
        assert_eq!(block.side, Side::Buy);
    }

    #[test]
    fn test_ingest_rejects_non_positive_qty() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        let audit = rig.engine.process(test_utils::feed_fill(
            0,
            test_utils::fill("X1", "O1", dec!(0), dec!(10.00), 20240115),
        ));

        assert!(matches!(
            audit.outcome,
            AuditOutcome::DeadLettered(RuleError::Validation(_))
        ));
        assert!(matches!(
            rig.dead_letters.try_next(),
            Some(DeadLetter::Fill { .. })
        ));
        assert!(rig.engine.store.read().executions.is_empty());
    }

    #[test]
    fn test_ingest_unknown_order_dead_letters_whole_message() {
        let mut rig = test_utils::rig(vec![]);

        let audit = rig.engine.process(test_utils::feed_fill(
            0,
            test_utils::fill("X1", "O-missing", dec!(100), dec!(10.00), 20240115),
        ));

        assert!(matches!(
            audit.outcome,
            AuditOutcome::DeadLettered(RuleError::MissingReference(_))
        ));

        // The chained transaction rolled back - no execution row either
        let tables = rig.engine.store.read();
        assert!(tables.executions.is_empty());
        assert!(tables.blocks.is_empty());
    }

    #[test]
    fn test_ingest_second_fill_reaggregates_same_block() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        rig.engine.process(test_utils::feed_fill(
            0,
            test_utils::fill("X1", "O1", dec!(60), dec!(10.00), 20240115),
        ));
        rig.engine.process(test_utils::feed_fill(
            1,
            test_utils::fill("X2", "O1", dec!(40), dec!(11.00), 20240115),
        ));

        let tables = rig.engine.store.read();
        assert_eq!(tables.blocks.len(), 1);

        let block = tables.blocks.values().next().unwrap();
        assert_eq!(block.gross_qty, dec!(100));
        assert_eq!(block.avg_price, dec!(10.40));
    }

    #[test]
    fn test_ingest_duplicate_block_bucket_halts() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);

        // Manufacture an invariant breach: two ready blocks in the same bucket
        let template = test_utils::fill("X1", "O1", dec!(100), dec!(10.00), 20240115);
        {
            let mut txn = rig.engine.store.begin();
            for block_id in ["blk-rogue-1", "blk-rogue-2"] {
                txn.upsert_block(BlockTrade::new(
                    BlockId::new(block_id),
                    template.instrument_id.clone(),
                    Side::Buy,
                    template.trade_date,
                    dec!(1),
                    dec!(1),
                    BlockStatus::ReadyToAllocate,
                ));
            }
            txn.commit();
        }

        let audit = rig.engine.process(test_utils::feed_fill(0, template));

        assert!(matches!(audit.outcome, AuditOutcome::Halted(_)));

        // Halted messages are not consumed
        assert_eq!(rig.engine.offsets.committed(), None);
    }

    #[test]
    fn test_duplicate_fill_acked_without_effect() {
        let mut rig = test_utils::rig(vec![test_utils::order("O1", "acct-1", Side::Buy, dec!(100))]);
        let fill = test_utils::fill("X1", "O1", dec!(100), dec!(10.00), 20240115);

        rig.engine
            .process(test_utils::feed_fill(0, fill.clone()));
        let audit = rig
            .engine
            .process(PipelineEvent::Feed(crate::feed::FeedMessage::new(
                1,
                crate::feed::FeedEvent::Fill(fill),
            )));

        assert!(matches!(audit.outcome, AuditOutcome::Duplicate(_)));
        assert_eq!(rig.engine.offsets.committed(), Some(1));
        assert_eq!(rig.engine.store.read().executions.len(), 1);
    }
}

use crate::{
    engine::{Engine, EngineOutput, rules::RuleStep},
    error::RuleError,
    outbox::Effect,
};
use itertools::Itertools;
use posttrade_execution::{
    allocation::Allocation,
    block::BlockStatus,
    event::{AllocationCreated, BlockReady, EventEnvelope},
    id::AllocId,
};
use rust_decimal::{Decimal, prelude::ToPrimitive};

impl Engine {
    /// AllocateBlock - fan the block's gross quantity out into per-account allocations.
    ///
    /// Participants are the distinct accounts holding orders for the block's instrument (no
    /// side or open-quantity filter, pending product confirmation), split equally at the
    /// quantity scale with the rounding residual assigned one unit at a time in lexicographic
    /// account order.
    ///
    /// Skips (idempotent no-op) unless the block is `ReadyToAllocate` - a replayed `BlockReady`
    /// for an already-allocated or busted block has no effect. Allocation quantities are taken
    /// from the block's current committed state, not the triggering event, so a stale event
    /// converges to the latest aggregation.
    pub(crate) fn allocate_block(&mut self, event: &BlockReady) -> Result<RuleStep, RuleError> {
        let mut txn = self.store.begin();

        let Some(mut block) = txn.block(&event.block_id) else {
            return Err(RuleError::MissingReference(format!(
                "block {}",
                event.block_id
            )));
        };

        if !block.is_allocatable() {
            return Ok(RuleStep::noop(EngineOutput::BlockSkipped(block.block_id)));
        }

        let participants = txn
            .orders_where(|order| order.instrument_id == block.instrument_id)
            .into_iter()
            .map(|order| order.account_id)
            .unique()
            .sorted()
            .collect::<Vec<_>>();

        if participants.is_empty() {
            return Err(RuleError::MissingReference(format!(
                "no orders for instrument {} of block {}",
                block.instrument_id, block.block_id
            )));
        }

        let quantities = split_quantities(block.gross_qty, participants.len());

        let mut effects = Vec::new();
        let mut allocations = 0;
        for (account_id, alloc_qty) in participants.into_iter().zip(quantities) {
            if alloc_qty <= Decimal::ZERO {
                continue;
            }

            let allocation = Allocation::new(
                AllocId::derive(&block.block_id, &account_id),
                block.block_id.clone(),
                account_id,
                alloc_qty,
                block.avg_price,
            );

            effects.push(Effect::Publish(EventEnvelope::new(AllocationCreated::from(
                &allocation,
            ))));
            txn.upsert_allocation(allocation);
            allocations += 1;
        }

        let block_id = block.block_id.clone();
        block.status = BlockStatus::Allocated;
        txn.upsert_block(block);

        let store_events = txn.commit();

        Ok(RuleStep {
            outputs: vec![EngineOutput::BlockAllocated {
                block_id,
                allocations,
            }],
            effects,
            store_events,
        })
    }
}

/// Equal split of `gross` across `participants` at the quantity scale.
///
/// The residual `gross − N·⌊gross/N⌋` is assigned one quantity unit at a time to the leading
/// participants (callers pass accounts in lexicographic order). When `gross` is smaller than
/// one unit per participant, only the leading participants receive a unit - a zero quantity is
/// never allocated.
pub(crate) fn split_quantities(gross: Decimal, participants: usize) -> Vec<Decimal> {
    let scale = gross.scale();
    let unit = Decimal::new(1, scale);
    let count = Decimal::from(participants as u64);

    let base = (gross / count).trunc_with_scale(scale);
    let residual_units = ((gross - base * count) / unit)
        .to_u64()
        .unwrap_or_default() as usize;

    let mut quantities = vec![base; participants];
    for quantity in quantities.iter_mut().take(residual_units) {
        *quantity += unit;
    }

    quantities
}

use crate::{
    PipelineEvent, Sequence,
    error::{DeadLetter, EngineError, RuleError},
    feed::{DedupeSet, FeedEvent, FeedMessage, OffsetTracker},
    outbox::{Effect, OutboxEntry},
    store::{Store, StoreEvent, TableRow},
};
use chrono::{DateTime, Utc};
use posttrade_execution::{
    event::{EventEnvelope, TradeEventKind},
    id::{BlockId, ExecId, SettleId},
};
use posttrade_instrument::{calendar::BusinessCalendar, currency::CurrencyScales};
use posttrade_integration::channel::{ChannelTxDroppable, UnboundedTx};
use rust_decimal::Decimal;
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, error, warn};

/// The five pipeline rules - ingest, aggregate, allocate, settle, bust.
pub mod rules;

/// `Engine` runners for processing input `PipelineEvents` until shutdown.
pub mod run;

/// Defines how a component processes an input Event and generates an appropriate Audit.
pub trait Processor<Event> {
    type Audit;
    fn process(&mut self, event: Event) -> Self::Audit;
}

/// Running [`Engine`] metadata.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EngineMeta {
    /// Start timestamp of the current [`Engine`] run.
    pub time_start: DateTime<Utc>,
    /// Monotonically increasing [`Sequence`] associated with the number of events processed.
    pub sequence: Sequence,
}

/// Post-trade processing `Engine` (one partition worker).
///
/// The `Engine`:
/// * Processes input [`PipelineEvent`]s strictly sequentially.
/// * Maintains the five-table [`Store`] projection via the pipeline rules.
/// * Stages outbound effects to the outbox at commit time.
/// * Surrenders the inbound offset only after the enclosing transaction commits.
#[derive(Debug)]
pub struct Engine {
    pub meta: EngineMeta,
    pub store: Arc<Store>,
    pub dedupe: DedupeSet,
    pub offsets: OffsetTracker,
    pub calendar: BusinessCalendar,
    pub scales: CurrencyScales,
    outbox_tx: ChannelTxDroppable<UnboundedTx<OutboxEntry, EngineError>>,
    dead_letter_tx: ChannelTxDroppable<UnboundedTx<DeadLetter, EngineError>>,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        dedupe: DedupeSet,
        calendar: BusinessCalendar,
        scales: CurrencyScales,
        outbox_tx: ChannelTxDroppable<UnboundedTx<OutboxEntry, EngineError>>,
        dead_letter_tx: ChannelTxDroppable<UnboundedTx<DeadLetter, EngineError>>,
    ) -> Self {
        Self {
            meta: EngineMeta {
                time_start: Utc::now(),
                sequence: Sequence(0),
            },
            store,
            dedupe,
            offsets: OffsetTracker::new(),
            calendar,
            scales,
            outbox_tx,
            dead_letter_tx,
        }
    }
}

impl Processor<PipelineEvent> for Engine {
    type Audit = EngineAudit;

    fn process(&mut self, event: PipelineEvent) -> EngineAudit {
        let sequence = self.meta.sequence.fetch_add();

        let outcome = match event {
            PipelineEvent::Shutdown => AuditOutcome::Shutdown,
            PipelineEvent::Feed(message) => self.process_feed(message, sequence),
            PipelineEvent::TradeEvent(envelope) => self.process_trade_event(envelope, sequence),
        };

        EngineAudit { sequence, outcome }
    }
}

impl Engine {
    fn process_feed(&mut self, message: FeedMessage<FeedEvent>, sequence: Sequence) -> AuditOutcome {
        let offset = message.offset;
        match message.payload {
            FeedEvent::Fill(execution) => {
                if self.dedupe.contains(&execution.exec_id) {
                    debug!(exec_id = %execution.exec_id, offset, "duplicate fill acked without effect");
                    self.offsets.commit(offset);
                    return AuditOutcome::Duplicate(execution.exec_id);
                }

                match self.run_cascade(sequence, |engine| engine.ingest_fill(&execution)) {
                    Ok(outputs) => {
                        self.dedupe
                            .insert(execution.exec_id.clone(), execution.trade_date);
                        self.offsets.commit(offset);
                        AuditOutcome::Processed(outputs)
                    }
                    Err(error) if error.is_fatal() => self.halt(error),
                    Err(error) => {
                        warn!(exec_id = %execution.exec_id, %error, "fill dead-lettered");
                        self.offsets.commit(offset);
                        self.dead_letter_tx.send(DeadLetter::Fill {
                            execution,
                            error: error.clone(),
                        });
                        AuditOutcome::DeadLettered(error)
                    }
                }
            }
            FeedEvent::Correction { exec_id, qty } => {
                match self.run_cascade(sequence, |engine| engine.apply_correction(&exec_id, qty)) {
                    Ok(outputs) => {
                        self.offsets.commit(offset);
                        AuditOutcome::Processed(outputs)
                    }
                    Err(error) if error.is_fatal() => self.halt(error),
                    Err(error) => {
                        warn!(%exec_id, %error, "correction dead-lettered");
                        self.offsets.commit(offset);
                        self.dead_letter_tx.send(DeadLetter::Correction {
                            exec_id,
                            qty,
                            error: error.clone(),
                        });
                        AuditOutcome::DeadLettered(error)
                    }
                }
            }
        }
    }

    fn process_trade_event(
        &mut self,
        envelope: EventEnvelope,
        sequence: Sequence,
    ) -> AuditOutcome {
        let TradeEventKind::BlockReady(block_ready) = envelope.kind.clone() else {
            return AuditOutcome::Ignored;
        };

        match self.run_cascade(sequence, |engine| engine.allocate_block(&block_ready)) {
            Ok(outputs) => AuditOutcome::Processed(outputs),
            Err(error) if error.is_fatal() => self.halt(error),
            Err(error) => {
                warn!(block_id = %block_ready.block_id, %error, "block event dead-lettered");
                self.dead_letter_tx.send(DeadLetter::Event {
                    envelope,
                    error: error.clone(),
                });
                AuditOutcome::DeadLettered(error)
            }
        }
    }

    /// Run the seed rule, then drive every follow-on step (loopback `BlockReady` consumption and
    /// store change notifications) to quiescence.
    ///
    /// Non-fatal follow-on failures dead-letter that step and continue; a fatal error aborts the
    /// cascade so the run loop can halt the worker.
    fn run_cascade(
        &mut self,
        sequence: Sequence,
        seed: impl FnOnce(&mut Self) -> Result<rules::RuleStep, RuleError>,
    ) -> Result<Vec<EngineOutput>, RuleError> {
        let mut outputs = Vec::new();
        let mut queue = VecDeque::new();

        let step = seed(self)?;
        self.absorb(step, sequence, &mut outputs, &mut queue);

        while let Some(follow_on) = queue.pop_front() {
            match self.follow_on_step(&follow_on) {
                Ok(Some(step)) => self.absorb(step, sequence, &mut outputs, &mut queue),
                Ok(None) => {}
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => self.dead_letter_follow_on(follow_on, error),
            }
        }

        Ok(outputs)
    }

    /// Record a completed rule step: emit its outputs, write its effects to the outbox, and
    /// queue its follow-on work.
    fn absorb(
        &mut self,
        step: rules::RuleStep,
        sequence: Sequence,
        outputs: &mut Vec<EngineOutput>,
        queue: &mut VecDeque<FollowOn>,
    ) {
        let rules::RuleStep {
            outputs: step_outputs,
            effects,
            store_events,
        } = step;

        outputs.extend(step_outputs);

        for effect in effects {
            // BlockReady is consumed back off TradeEvents by this same worker; loop it back
            // directly so the allocation happens within the same inbound message bracket. The
            // canonical publish still goes through the outbox.
            if let Effect::Publish(envelope) = &effect
                && matches!(envelope.kind, TradeEventKind::BlockReady(_))
            {
                queue.push_back(FollowOn::TradeEvent(envelope.clone()));
            }

            self.outbox_tx.send(OutboxEntry::new(sequence, effect));
        }

        queue.extend(store_events.into_iter().map(FollowOn::Store));
    }

    fn follow_on_step(
        &mut self,
        follow_on: &FollowOn,
    ) -> Result<Option<rules::RuleStep>, RuleError> {
        match follow_on {
            FollowOn::TradeEvent(envelope) => match &envelope.kind {
                TradeEventKind::BlockReady(block_ready) => {
                    self.allocate_block(block_ready).map(Some)
                }
                _ => Ok(None),
            },
            FollowOn::Store(StoreEvent::Created(TableRow::Allocation(allocation))) => {
                self.generate_settlement(allocation).map(Some)
            }
            FollowOn::Store(StoreEvent::Updated(TableRow::Execution(execution)))
                if execution.qty <= Decimal::ZERO =>
            {
                self.handle_bust(execution).map(Some)
            }
            FollowOn::Store(_) => Ok(None),
        }
    }

    fn dead_letter_follow_on(&mut self, follow_on: FollowOn, error: RuleError) {
        let dead_letter = match follow_on {
            FollowOn::TradeEvent(envelope) => DeadLetter::Event { envelope, error },
            FollowOn::Store(event) => match event.row() {
                TableRow::Allocation(allocation) => DeadLetter::Allocation {
                    alloc_id: allocation.alloc_id.clone(),
                    error,
                },
                TableRow::Execution(execution) => DeadLetter::Correction {
                    exec_id: execution.exec_id.clone(),
                    qty: execution.qty,
                    error,
                },
                _ => {
                    warn!(%error, "store notification dead-lettered without context");
                    return;
                }
            },
        };

        warn!(?dead_letter, "follow-on step dead-lettered");
        self.dead_letter_tx.send(dead_letter);
    }

    fn halt(&self, error: RuleError) -> AuditOutcome {
        error!(
            sequence = self.meta.sequence.value(),
            %error,
            "invariant breached - halting worker"
        );
        AuditOutcome::Halted(error.to_string())
    }
}

/// Internal follow-on work queued by a committed rule step.
#[derive(Debug, Clone)]
enum FollowOn {
    TradeEvent(EventEnvelope),
    Store(StoreEvent),
}

/// Audit of one processed [`PipelineEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAudit {
    pub sequence: Sequence,
    pub outcome: AuditOutcome,
}

/// What processing one [`PipelineEvent`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// The event (and its full follow-on cascade) committed.
    Processed(Vec<EngineOutput>),

    /// Duplicate fill absorbed by the dedupe set.
    Duplicate(ExecId),

    /// Consumed `TradeEvents` envelope with no rule bound to it.
    Ignored,

    /// The event was withdrawn to the dead-letter channel.
    DeadLettered(RuleError),

    /// Fatal invariant breach - the worker must stop.
    Halted(String),

    /// Graceful shutdown requested.
    Shutdown,
}

impl AuditOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditOutcome::Halted(_) | AuditOutcome::Shutdown)
    }
}

/// Individual rule outcomes within a [`AuditOutcome::Processed`] cascade.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EngineOutput {
    ExecutionIngested(ExecId),
    BlockAggregated(BlockId),
    BlockAllocated {
        block_id: BlockId,
        allocations: usize,
    },
    /// Allocation skipped - the block was no longer ready to allocate (idempotent no-op).
    BlockSkipped(BlockId),
    SettlementStaged(SettleId),
    CorrectionApplied(ExecId),
    BlockBusted(BlockId),
    /// Bust correction for an execution with no aggregated block.
    BustIgnored(ExecId),
}

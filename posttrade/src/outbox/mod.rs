use crate::Sequence;
use derive_more::Constructor;
use posttrade_execution::{event::EventEnvelope, settlement::SettlementInstruction};

/// Drains committed [`OutboxEntry`]s to the `TradeEvents` topic and the settlement gateway.
pub mod dispatcher;

/// Outbound side effect staged by a rule and written to the outbox at commit time.
///
/// Effects are dispatched after (and only after) the store mutations they accompany have
/// committed, giving at-least-once delivery of outbound effects with at-most-once store
/// mutation per inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Publish an envelope on the `TradeEvents` topic.
    Publish(EventEnvelope),

    /// POST a settlement instruction to the gateway, publishing `SettlementSent` on ack.
    SendSettlement(SettlementInstruction),
}

/// One committed outbound effect, stamped with the [`Sequence`] of the pipeline event that
/// produced it.
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct OutboxEntry {
    pub sequence: Sequence,
    pub effect: Effect,
}

use crate::{engine::EngineOutput, outbox::Effect, store::StoreEvent};

/// IngestExecution + BuildBlockTrades - chained in one transaction per inbound fill.
pub mod ingest;

/// AllocateBlock - fan a ready block out into per-account allocations.
pub mod allocate;

/// GenerateSettlement - materialise and stage a settlement instruction per created allocation.
pub mod settle;

/// HandleBust - react to an execution quantity forced to zero.
pub mod bust;

/// Outcome of one committed rule invocation.
///
/// `effects` are written to the outbox after the mutations they accompany have committed;
/// `store_events` are the post-commit notifications driving follow-on rules.
#[derive(Debug, Default)]
pub(crate) struct RuleStep {
    pub outputs: Vec<EngineOutput>,
    pub effects: Vec<Effect>,
    pub store_events: Vec<StoreEvent>,
}

impl RuleStep {
    /// A step that did nothing but record an outcome (idempotent no-op).
    pub fn noop(output: EngineOutput) -> Self {
        Self {
            outputs: vec![output],
            ..Self::default()
        }
    }
}

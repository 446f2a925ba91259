use crate::store::StoreError;
use posttrade_execution::{
    error::ClientError,
    event::EventEnvelope,
    fill::Execution,
    id::{AllocId, ExecId},
    settlement::SettlementInstruction,
};
use posttrade_integration::error::TransportError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while a rule processes one pipeline event.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RuleError {
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl RuleError {
    /// A fatal error is an invariant breach that halts the worker rather than dead-lettering
    /// the message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuleError::Store(StoreError::NotUnique { .. }))
    }
}

/// All possible errors in Posttrade core.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("config: {0}")]
    Config(String),

    #[error("task failed: {0}")]
    Task(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for EngineError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed(std::any::type_name::<T>())
    }
}

/// A message (or outbound effect) withdrawn from the pipeline with its rejection reason.
///
/// Dead-letters are forwarded on a dedicated channel for operator intervention; the store is
/// left exactly as it was before the offending message.
#[derive(Debug, Clone, PartialEq)]
pub enum DeadLetter {
    /// Inbound fill rejected (validation or missing reference).
    Fill { execution: Execution, error: RuleError },

    /// Bust correction for an unknown execution.
    Correction {
        exec_id: ExecId,
        qty: Decimal,
        error: RuleError,
    },

    /// Consumed `TradeEvents` envelope that could not be processed.
    Event {
        envelope: EventEnvelope,
        error: RuleError,
    },

    /// Allocation for which no settlement instruction could be materialised.
    Allocation { alloc_id: AllocId, error: RuleError },

    /// Settlement instruction terminally rejected by the gateway.
    Settlement {
        instruction: SettlementInstruction,
        error: ClientError,
    },
}

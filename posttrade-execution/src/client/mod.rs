use crate::{error::ClientError, settlement::SettlementInstruction};
use async_trait::async_trait;

/// Recording mock [`SettlementClient`] for tests and dry runs.
pub mod mock;

/// REST [`SettlementClient`] implementation.
pub mod rest;

/// Client interface to the downstream settlement gateway.
///
/// Implementations own the retry policy; a returned error is terminal for the instruction.
/// The instruction's `settle_id` doubles as the gateway idempotency key, so callers may safely
/// re-send on redrive.
#[async_trait]
pub trait SettlementClient
where
    Self: Send + Sync,
{
    async fn send(&self, instruction: &SettlementInstruction) -> Result<(), ClientError>;
}

use crate::{
    PipelineEvent,
    engine::{AuditOutcome, Engine, EngineAudit, Processor},
};
use futures::{Stream, StreamExt};
use posttrade_integration::channel::{ChannelTxDroppable, Tx};
use tracing::info;

/// Why an [`Engine`] run ended.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ShutdownReason {
    /// The inbound feed ended.
    FeedEnded,

    /// A [`PipelineEvent::Shutdown`] was received.
    Commanded,

    /// Fatal invariant breach - the worker stopped without surrendering the offending offset.
    Halted(String),
}

/// Synchronous `Engine` runner processing input [`PipelineEvent`]s until shutdown.
///
/// Audits are forwarded to the provided `AuditTx` (drop the receiver to disable auditing).
pub fn sync_run<Events, AuditTx>(
    feed: &mut Events,
    engine: &mut Engine,
    audit_tx: &mut ChannelTxDroppable<AuditTx>,
) -> ShutdownReason
where
    Events: Iterator<Item = PipelineEvent>,
    AuditTx: Tx<Item = EngineAudit>,
{
    info!(feed_mode = "sync", "Engine running");

    let shutdown = loop {
        let Some(event) = feed.next() else {
            break ShutdownReason::FeedEnded;
        };

        let audit = engine.process(event);
        let shutdown = shutdown_reason(&audit);
        audit_tx.send(audit);

        if let Some(shutdown) = shutdown {
            break shutdown;
        }
    };

    info!(?shutdown, "Engine shutting down");
    shutdown
}

/// Asynchronous `Engine` runner processing input [`PipelineEvent`]s until shutdown.
///
/// Audits are forwarded to the provided `AuditTx` (drop the receiver to disable auditing).
pub async fn async_run<Events, AuditTx>(
    feed: &mut Events,
    engine: &mut Engine,
    audit_tx: &mut ChannelTxDroppable<AuditTx>,
) -> ShutdownReason
where
    Events: Stream<Item = PipelineEvent> + Unpin,
    AuditTx: Tx<Item = EngineAudit>,
{
    info!(feed_mode = "async", "Engine running");

    let shutdown = loop {
        let Some(event) = feed.next().await else {
            break ShutdownReason::FeedEnded;
        };

        let audit = engine.process(event);
        let shutdown = shutdown_reason(&audit);
        audit_tx.send(audit);

        if let Some(shutdown) = shutdown {
            break shutdown;
        }
    };

    info!(?shutdown, "Engine shutting down");
    shutdown
}

fn shutdown_reason(audit: &EngineAudit) -> Option<ShutdownReason> {
    match &audit.outcome {
        AuditOutcome::Shutdown => Some(ShutdownReason::Commanded),
        AuditOutcome::Halted(reason) => Some(ShutdownReason::Halted(reason.clone())),
        _ => None,
    }
}

use crate::{
    PipelineEvent,
    engine::{
        Engine, EngineAudit,
        run::{ShutdownReason, async_run},
    },
    error::{DeadLetter, EngineError},
    feed::{DedupeSet, FeedEvent, FeedMessage},
    outbox::dispatcher::OutboxDispatcher,
    store::Store,
    system::config::SystemConfig,
};
use posttrade_execution::{
    client::{SettlementClient, rest::RestSettlementClient},
    event::EventEnvelope,
    fill::Execution,
    id::ExecId,
};
use posttrade_integration::channel::{
    ChannelTxDroppable, Tx, UnboundedRx, UnboundedTx, mpsc_unbounded,
};
use rust_decimal::Decimal;
use std::{
    sync::Arc,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::info;

/// Full pipeline system configuration.
pub mod config;

/// Builder for wiring a full pipeline [`System`] onto the current Tokio runtime.
#[derive(Debug)]
pub struct SystemBuilder {
    config: SystemConfig,
}

impl SystemBuilder {
    pub fn new(config: SystemConfig) -> Self {
        Self { config }
    }

    /// Initialise the [`System`] with a REST settlement client built from the gateway config.
    ///
    /// Must be called within a Tokio runtime.
    pub fn init(self) -> Result<System, EngineError> {
        let client = RestSettlementClient::new(
            self.config.gateway.base_url.clone(),
            self.config.gateway.retry,
            Duration::from_secs(self.config.gateway.send_ttl_secs),
        )?;

        self.init_with_client(client)
    }

    /// Initialise the [`System`] with the provided [`SettlementClient`] implementation.
    ///
    /// Must be called within a Tokio runtime.
    pub fn init_with_client<Client>(self, client: Client) -> Result<System, EngineError>
    where
        Client: SettlementClient + 'static,
    {
        let SystemConfig {
            feed,
            gateway: _,
            currency_scales,
            calendar,
            instruments,
            orders,
        } = self.config;

        let (engine_tx, engine_rx) = mpsc_unbounded::<PipelineEvent, EngineError>();
        let (outbox_tx, outbox_rx) = mpsc_unbounded();
        let (events_tx, events) = mpsc_unbounded();
        let (dead_letter_tx, dead_letters) = mpsc_unbounded();
        let (audit_tx, audits) = mpsc_unbounded::<EngineAudit, EngineError>();

        // Seed reference data before the engine starts consuming
        let store = Arc::new(Store::new());
        {
            let mut txn = store.begin();
            for instrument in instruments {
                txn.upsert_instrument(instrument);
            }
            for order in orders {
                txn.upsert_order(order);
            }
            txn.commit();
        }

        let mut engine = Engine::new(
            Arc::clone(&store),
            DedupeSet::new(feed.dedupe_shards, feed.dedupe_horizon_days, calendar.clone()),
            calendar,
            currency_scales,
            ChannelTxDroppable::new(outbox_tx),
            ChannelTxDroppable::new(dead_letter_tx.clone()),
        );

        let engine_handle = tokio::spawn(async move {
            let mut feed = engine_rx.into_stream();
            let mut audit_tx = ChannelTxDroppable::new(audit_tx);
            async_run(&mut feed, &mut engine, &mut audit_tx).await
        });

        let dispatcher = OutboxDispatcher::new(
            outbox_rx,
            ChannelTxDroppable::new(events_tx),
            ChannelTxDroppable::new(dead_letter_tx),
            client,
        );
        let dispatcher_handle = tokio::spawn(dispatcher.run());

        info!(topic = %feed.topic, events_topic = %feed.events_topic, "System initialised");

        Ok(System {
            store,
            events,
            dead_letters,
            audits,
            engine_tx,
            engine_handle,
            dispatcher_handle,
            next_offset: AtomicU64::new(0),
        })
    }
}

/// Running pipeline system handle.
///
/// Inbound messages are injected with [`Self::send_fill`] / [`Self::send_correction`]; the
/// canonical event stream, dead-letters and engine audits are consumed from the public
/// receivers.
#[derive(Debug)]
pub struct System {
    pub store: Arc<Store>,
    pub events: UnboundedRx<EventEnvelope>,
    pub dead_letters: UnboundedRx<DeadLetter>,
    pub audits: UnboundedRx<EngineAudit>,
    engine_tx: UnboundedTx<PipelineEvent, EngineError>,
    engine_handle: JoinHandle<ShutdownReason>,
    dispatcher_handle: JoinHandle<()>,
    next_offset: AtomicU64,
}

impl System {
    /// Inject a fill as the next `ExecutionFeed` message.
    pub fn send_fill(&self, execution: Execution) -> Result<(), EngineError> {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        self.engine_tx.send(PipelineEvent::Feed(FeedMessage::new(
            offset,
            FeedEvent::Fill(execution),
        )))
    }

    /// Inject an operator bust correction, forcing the execution quantity to the provided
    /// value.
    pub fn send_correction(&self, exec_id: ExecId, qty: Decimal) -> Result<(), EngineError> {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        self.engine_tx.send(PipelineEvent::Feed(FeedMessage::new(
            offset,
            FeedEvent::Correction { exec_id, qty },
        )))
    }

    /// Fully bust an execution (quantity forced to zero).
    pub fn bust_execution(&self, exec_id: ExecId) -> Result<(), EngineError> {
        self.send_correction(exec_id, Decimal::ZERO)
    }

    /// Gracefully shut down: the engine drains queued inbound messages, then the dispatcher
    /// drains the outbox.
    pub async fn shutdown(self) -> Result<ShutdownReason, EngineError> {
        self.engine_tx.send(PipelineEvent::Shutdown)?;
        drop(self.engine_tx);

        let shutdown = self
            .engine_handle
            .await
            .map_err(|error| EngineError::Task(error.to_string()))?;

        self.dispatcher_handle
            .await
            .map_err(|error| EngineError::Task(error.to_string()))?;

        Ok(shutdown)
    }
}

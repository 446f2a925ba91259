use crate::{
    error::{DeadLetter, EngineError},
    outbox::{Effect, OutboxEntry},
};
use fnv::FnvHashSet;
use posttrade_execution::{
    client::SettlementClient,
    event::{EventEnvelope, SettlementSent},
    id::{EventId, SettleId},
    settlement::SettlementInstruction,
};
use posttrade_integration::channel::{ChannelTxDroppable, UnboundedRx, UnboundedTx};
use tracing::{debug, info, warn};

/// Drains the outbox: publishes envelopes to the `TradeEvents` topic and POSTs settlement
/// instructions to the gateway, publishing `SettlementSent` once the gateway acks.
///
/// Publishing is idempotent on event id and sending is idempotent on settle id, so redriven
/// entries are absorbed here rather than duplicated downstream.
#[derive(Debug)]
pub struct OutboxDispatcher<Client> {
    rx: UnboundedRx<OutboxEntry>,
    events_tx: ChannelTxDroppable<UnboundedTx<EventEnvelope, EngineError>>,
    dead_letter_tx: ChannelTxDroppable<UnboundedTx<DeadLetter, EngineError>>,
    client: Client,
    published: FnvHashSet<EventId>,
    sent: FnvHashSet<SettleId>,
}

impl<Client> OutboxDispatcher<Client>
where
    Client: SettlementClient,
{
    pub fn new(
        rx: UnboundedRx<OutboxEntry>,
        events_tx: ChannelTxDroppable<UnboundedTx<EventEnvelope, EngineError>>,
        dead_letter_tx: ChannelTxDroppable<UnboundedTx<DeadLetter, EngineError>>,
        client: Client,
    ) -> Self {
        Self {
            rx,
            events_tx,
            dead_letter_tx,
            client,
            published: FnvHashSet::default(),
            sent: FnvHashSet::default(),
        }
    }

    /// Drain entries until every outbox transmitter has dropped and the log is empty.
    pub async fn run(mut self) {
        info!("OutboxDispatcher running");

        while let Some(entry) = self.rx.rx.recv().await {
            self.dispatch(entry).await;
        }

        info!("OutboxDispatcher drained, shutting down");
    }

    /// Dispatch a single entry.
    pub async fn dispatch(&mut self, entry: OutboxEntry) {
        match entry.effect {
            Effect::Publish(envelope) => self.publish(envelope),
            Effect::SendSettlement(instruction) => self.send_settlement(instruction).await,
        }
    }

    fn publish(&mut self, envelope: EventEnvelope) {
        if !self.published.insert(envelope.event_id.clone()) {
            debug!(event_id = %envelope.event_id, "duplicate envelope absorbed");
            return;
        }

        self.events_tx.send(envelope);
    }

    async fn send_settlement(&mut self, instruction: SettlementInstruction) {
        if !self.sent.insert(instruction.settle_id.clone()) {
            debug!(settle_id = %instruction.settle_id, "duplicate settlement absorbed");
            return;
        }

        match self.client.send(&instruction).await {
            Ok(()) => {
                let envelope = EventEnvelope::new(SettlementSent::from(&instruction));
                self.publish(envelope);
            }
            Err(error) => {
                warn!(
                    settle_id = %instruction.settle_id,
                    %error,
                    "settlement dead-lettered"
                );
                self.dead_letter_tx
                    .send(DeadLetter::Settlement { instruction, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sequence;
    use posttrade_execution::{
        client::mock::MockSettlementClient,
        error::ClientError,
        event::BlockReady,
        id::{AllocId, BlockId},
        settlement::SettleMethod,
    };
    use posttrade_instrument::{account::AccountId, calendar::BusinessDate, instrument::name::Isin};
    use posttrade_integration::channel::mpsc_unbounded;
    use rust_decimal_macros::dec;

    fn instruction() -> SettlementInstruction {
        SettlementInstruction::new(
            SettleId::derive(&AllocId::new("alc-1")),
            AllocId::new("alc-1"),
            AccountId::new("acct-1"),
            Isin::new("US0378331005"),
            BusinessDate::from_yyyymmdd(20240117).unwrap(),
            SettleMethod::Dvp,
            dec!(1000.00),
        )
    }

    fn dispatcher() -> (
        OutboxDispatcher<MockSettlementClient>,
        UnboundedTx<OutboxEntry, EngineError>,
        UnboundedRx<EventEnvelope>,
        UnboundedRx<DeadLetter>,
        MockSettlementClient,
    ) {
        let (outbox_tx, outbox_rx) = mpsc_unbounded();
        let (events_tx, events_rx) = mpsc_unbounded();
        let (dead_letter_tx, dead_letter_rx) = mpsc_unbounded();
        let client = MockSettlementClient::new();

        let dispatcher = OutboxDispatcher::new(
            outbox_rx,
            ChannelTxDroppable::new(events_tx),
            ChannelTxDroppable::new(dead_letter_tx),
            client.clone(),
        );

        (dispatcher, outbox_tx, events_rx, dead_letter_rx, client)
    }

    fn block_ready_entry() -> OutboxEntry {
        OutboxEntry::new(
            Sequence(0),
            Effect::Publish(EventEnvelope::new(BlockReady {
                block_id: BlockId::new("blk-1"),
                gross_qty: dec!(100),
                avg_price: dec!(10.00),
            })),
        )
    }

    #[test]
    fn test_publish_dedupes_on_event_id() {
        tokio_test::block_on(async {
            let (mut dispatcher, _outbox_tx, mut events_rx, _dead_letters, _client) = dispatcher();

            dispatcher.dispatch(block_ready_entry()).await;
            dispatcher.dispatch(block_ready_entry()).await;

            assert!(events_rx.try_next().is_some());
            assert!(events_rx.try_next().is_none());
        });
    }

    #[test]
    fn test_settlement_ack_publishes_settlement_sent() {
        tokio_test::block_on(async {
            let (mut dispatcher, _outbox_tx, mut events_rx, _dead_letters, client) = dispatcher();

            let instruction = instruction();
            dispatcher
                .dispatch(OutboxEntry::new(
                    Sequence(0),
                    Effect::SendSettlement(instruction.clone()),
                ))
                .await;

            assert_eq!(client.sent(), vec![instruction.clone()]);

            let envelope = events_rx.try_next().unwrap();
            assert_eq!(
                envelope,
                EventEnvelope::new(SettlementSent::from(&instruction))
            );
        });
    }

    #[test]
    fn test_settlement_dedupes_on_settle_id() {
        tokio_test::block_on(async {
            let (mut dispatcher, _outbox_tx, _events_rx, _dead_letters, client) = dispatcher();

            let entry = OutboxEntry::new(Sequence(0), Effect::SendSettlement(instruction()));
            dispatcher.dispatch(entry.clone()).await;
            dispatcher.dispatch(entry).await;

            assert_eq!(client.sent_count(), 1);
        });
    }

    #[test]
    fn test_terminal_settlement_failure_dead_letters() {
        tokio_test::block_on(async {
            let (mut dispatcher, _outbox_tx, mut events_rx, mut dead_letters, client) =
                dispatcher();

            client.script_failure(ClientError::Terminal {
                status: 422,
                body: "unknown isin".to_string(),
            });

            dispatcher
                .dispatch(OutboxEntry::new(
                    Sequence(0),
                    Effect::SendSettlement(instruction()),
                ))
                .await;

            assert!(events_rx.try_next().is_none());
            assert!(matches!(
                dead_letters.try_next(),
                Some(DeadLetter::Settlement { .. })
            ));
        });
    }
}

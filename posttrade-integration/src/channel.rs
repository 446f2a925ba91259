use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::warn;

/// Transmitter of pipeline items.
///
/// Components depend on this interface rather than a concrete channel so tests can substitute
/// capturing implementations.
pub trait Tx
where
    Self: Clone + Send,
{
    type Item;
    type Error;
    fn send(&self, item: Self::Item) -> Result<(), Self::Error>;
}

/// [`Tx`] backed by an unbounded tokio mpsc channel.
#[derive(Debug)]
pub struct UnboundedTx<T, Error> {
    pub tx: tokio::sync::mpsc::UnboundedSender<T>,
    phantom: PhantomData<Error>,
}

// Manual impl: cloning the sender must not require Error: Clone
impl<T, Error> Clone for UnboundedTx<T, Error> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T, Error> UnboundedTx<T, Error> {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<T>) -> Self {
        Self {
            tx,
            phantom: PhantomData,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T, Error> Tx for UnboundedTx<T, Error>
where
    T: Send,
    Error: From<tokio::sync::mpsc::error::SendError<T>> + Send,
{
    type Item = T;
    type Error = Error;

    fn send(&self, item: Self::Item) -> Result<(), Self::Error> {
        self.tx.send(item).map_err(Error::from)
    }
}

/// Receiver half of [`mpsc_unbounded`].
#[derive(Debug, Constructor)]
pub struct UnboundedRx<T> {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

impl<T> UnboundedRx<T> {
    /// Receive the next item, blocking the calling thread until one is available or all
    /// transmitters have dropped.
    ///
    /// Must not be called from within an async runtime - use [`Self::into_stream`] there.
    pub fn next_blocking(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Receive the next already-buffered item without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<T> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}

/// Construct an unbounded channel with typed transmitter and receiver halves.
pub fn mpsc_unbounded<T, Error>() -> (UnboundedTx<T, Error>, UnboundedRx<T>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (UnboundedTx::new(tx), UnboundedRx::new(rx))
}

/// [`Tx`] wrapper that disables itself after the receiver drops, rather than erroring on every
/// subsequent send.
///
/// Used for optional consumers such as audit and dead-letter subscribers.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub struct ChannelTxDroppable<ChannelTx> {
    pub state: ChannelState<ChannelTx>,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx> {
    pub fn new(tx: ChannelTx) -> Self {
        Self {
            state: ChannelState::Active(tx),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Display)]
pub enum ChannelState<Tx> {
    Active(Tx),
    Disabled,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx>
where
    ChannelTx: Tx,
{
    pub fn send(&mut self, item: ChannelTx::Item) {
        let ChannelState::Active(tx) = &self.state else {
            return;
        };

        if tx.send(item).is_err() {
            let name = std::any::type_name::<ChannelTx::Item>();
            warn!(
                name,
                "ChannelTxDroppable receiver dropped - items will no longer be sent"
            );
            self.state = ChannelState::Disabled
        }
    }
}

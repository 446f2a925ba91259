#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Posttrade
//! Posttrade core is a rule-driven post-trade processing engine for an equities/fixed-income/
//! swaps desk. It consumes raw fill events from a market execution feed, aggregates them into
//! block trades, fans them out into per-account allocations, and dispatches settlement
//! instructions to a downstream gateway, publishing a canonical stream of business events along
//! the way.
//!
//! At a high-level, it provides a few major components:
//! * Transactional five-table [`Store`](store::Store) projection with post-commit change
//!   notifications.
//! * [`Engine`](engine::Engine) that runs the five pipeline rules (ingest, aggregate, allocate,
//!   settle, bust) with ordering, deduplication and idempotency contracts under at-least-once
//!   delivery.
//! * Outbox [`dispatcher`](outbox::dispatcher) bridging transactional store mutations to the
//!   `TradeEvents` topic and the settlement gateway.
//! * [`System`](system::System) utilities for wiring a full pipeline onto Tokio.

use crate::feed::{FeedEvent, FeedMessage};
use derive_more::From;
use posttrade_execution::event::EventEnvelope;
use serde::{Deserialize, Serialize};

/// Post-trade processing `Engine`, the five pipeline rules, and entry points for processing
/// input `PipelineEvents`.
///
/// eg/ `Engine`, `run`, `Processor`, etc.
pub mod engine;

/// Defines all possible errors in Posttrade core.
pub mod error;

/// Inbound execution feed types - messages, offsets, and the `exec_id` dedupe set.
pub mod feed;

/// Provides default Posttrade core Tracing logging initialisers.
pub mod logging;

/// Durable outbound effect log and its dispatcher.
pub mod outbox;

/// Transactional projection of the five pipeline tables.
pub mod store;

/// Utilities for initialising and interacting with a full pipeline system.
pub mod system;

/// Monotonically increasing event sequence number, incremented once per processed
/// [`PipelineEvent`].
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Deserialize,
    Serialize,
    From,
)]
pub struct Sequence(pub u64);

impl Sequence {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn fetch_add(&mut self) -> Sequence {
        let sequence = *self;
        self.0 += 1;
        sequence
    }
}

/// Default [`Engine`](engine::Engine) event that encompasses inbound feed messages, `TradeEvents`
/// consumed back off the bus, and pipeline shutdown.
#[derive(Debug, Clone, PartialEq, From)]
pub enum PipelineEvent {
    /// Message consumed from the `ExecutionFeed` topic (or the operator correction input).
    Feed(FeedMessage<FeedEvent>),

    /// Envelope consumed from the `TradeEvents` topic (eg/ `BlockReady` triggering allocation).
    TradeEvent(EventEnvelope),

    /// Graceful shutdown request.
    Shutdown,
}

impl PipelineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

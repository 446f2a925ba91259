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
#![allow(clippy::type_complexity, type_alias_bounds)]

//! # Posttrade-Execution
//! Post-trade domain model shared by the processing pipeline: realised executions, aggregated
//! block trades, per-account allocations and outbound settlement instructions, together with the
//! canonical `TradeEvents` envelope and the settlement gateway client.
//!
//! Identifiers for derived entities (blocks, allocations, settlements) are pure functions of
//! their inputs, so re-processing a replayed message re-derives the same row keys and "create"
//! degrades to an idempotent upsert.

/// Per-account [`Allocation`](allocation::Allocation) slice of a block trade.
pub mod allocation;

/// Aggregated [`BlockTrade`](block::BlockTrade) parent and its lifecycle
/// [`BlockStatus`](block::BlockStatus).
pub mod block;

/// Settlement gateway client - [`SettlementClient`](client::SettlementClient) interface,
/// REST implementation, and a recording mock for tests.
pub mod client;

/// All settlement client errors.
pub mod error;

/// Canonical `TradeEvents` envelope and payloads.
pub mod event;

/// Realised fill - the [`Execution`](fill::Execution) row ingested from the execution feed.
pub mod fill;

/// Deterministic identifier newtypes and their derivation.
pub mod id;

/// Monetary rounding helpers (half-even at instrument currency scale).
pub mod money;

/// Client [`Order`](order::Order) intent, seeded externally.
pub mod order;

/// Outbound [`SettlementInstruction`](settlement::SettlementInstruction).
pub mod settlement;

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

//! # Posttrade-Integration
//! Low-level plumbing for composing the post-trade pipeline: channel abstractions used between
//! pipeline components, a minimal REST client for internal gateways, and the shared retry/backoff
//! policy.

/// Channel abstractions - [`Tx`](channel::Tx), [`UnboundedTx`](channel::UnboundedTx), and the
/// drop-tolerant [`ChannelTxDroppable`](channel::ChannelTxDroppable).
pub mod channel;

/// All transport related errors generated in `posttrade-integration`.
pub mod error;

/// REST protocol plumbing - [`RestClient`](protocol::http::rest::RestClient) and the
/// [`RestRequest`](protocol::http::rest::RestRequest) interface.
pub mod protocol;

/// Shared exponential backoff [`RetryPolicy`](retry::RetryPolicy).
pub mod retry;

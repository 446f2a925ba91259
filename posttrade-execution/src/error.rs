use thiserror::Error;

/// All errors surfaced by a [`SettlementClient`](crate::client::SettlementClient).
///
/// Transient failures (network errors, 5xx, 408, 429) are retried inside the client and never
/// surface; every surfaced error is terminal for the instruction and dead-letters it.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ClientError {
    #[error("settlement request could not be constructed: {0}")]
    Build(String),

    #[error("terminal gateway response {status}: {body}")]
    Terminal { status: u16, body: String },

    #[error("settlement retry TTL exceeded after {attempts} attempts")]
    TtlExceeded { attempts: u32 },
}

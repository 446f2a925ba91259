use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff policy shared by outbound adapters (broker publishes, gateway calls).
///
/// The delay for attempt `n` (0-indexed) is `initial * multiplier^n`, capped at `max`, with a
/// uniformly random jitter of `jitter_pct` applied in both directions.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryPolicy {
    pub backoff_ms_initial: u64,
    pub backoff_multiplier: u32,
    pub backoff_ms_max: u64,
    pub jitter_pct: f64,
}

/// Default gateway retry policy: 250ms initial, doubling, 30s cap, ±20% jitter.
pub const DEFAULT_RETRY_POLICY: RetryPolicy = RetryPolicy {
    backoff_ms_initial: 250,
    backoff_multiplier: 2,
    backoff_ms_max: 30_000,
    jitter_pct: 0.2,
};

impl Default for RetryPolicy {
    fn default() -> Self {
        DEFAULT_RETRY_POLICY
    }
}

impl RetryPolicy {
    /// Backoff delay for the provided attempt (0-indexed), before jitter.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = (self.backoff_multiplier as u64).saturating_pow(attempt);
        self.backoff_ms_initial
            .saturating_mul(factor)
            .min(self.backoff_ms_max)
    }

    /// Jittered backoff [`Duration`] for the provided attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_ms(attempt) as f64;
        let jitter = rand::rng().random_range(-self.jitter_pct..=self.jitter_pct);
        Duration::from_millis((base * (1.0 + jitter)).max(0.0) as u64)
    }
}

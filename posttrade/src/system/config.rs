use posttrade_execution::order::Order;
use posttrade_instrument::{
    calendar::BusinessCalendar, currency::CurrencyScales, instrument::Instrument,
};
use posttrade_integration::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Top-level configuration for a full post-trade pipeline system.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemConfig {
    /// Inbound `ExecutionFeed` configuration.
    pub feed: FeedConfig,

    /// Settlement gateway configuration.
    pub gateway: GatewayConfig,

    /// Per-currency decimal scale overrides used when rounding monetary amounts.
    #[serde(default)]
    pub currency_scales: CurrencyScales,

    /// Business-day calendar holidays (weekends are always non-business days).
    #[serde(default)]
    pub calendar: BusinessCalendar,

    /// Instrument reference data seeded into the store at startup.
    #[serde(default)]
    pub instruments: Vec<Instrument>,

    /// Client orders seeded into the store at startup.
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Inbound feed configuration.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Broker bootstrap servers for the execution feed.
    pub brokers: Vec<String>,

    /// Inbound topic carrying raw fills.
    #[serde(default = "default_executions_topic")]
    pub topic: String,

    /// Outbound topic carrying the canonical business event stream.
    #[serde(default = "default_events_topic")]
    pub events_topic: String,

    /// Business days an `exec_id` stays in the dedupe set beyond its trade date.
    #[serde(default = "default_dedupe_horizon_days")]
    pub dedupe_horizon_days: u32,

    /// Shard count of the dedupe set.
    #[serde(default = "default_dedupe_shards")]
    pub dedupe_shards: usize,
}

fn default_executions_topic() -> String {
    "fix.executions".to_string()
}

fn default_events_topic() -> String {
    "trade.events".to_string()
}

fn default_dedupe_horizon_days() -> u32 {
    7
}

fn default_dedupe_shards() -> usize {
    16
}

/// Settlement gateway configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Base Url of the settlement gateway, eg/ `https://settlement.internal`.
    pub base_url: String,

    /// Retry/backoff policy for transient gateway failures.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Bound (seconds) on how long one instruction is retried before it dead-letters.
    #[serde(default = "default_send_ttl_secs")]
    pub send_ttl_secs: u64,
}

fn default_send_ttl_secs() -> u64 {
    24 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_minimal_config_applies_defaults() {
        let json = r#"{
            "feed": { "brokers": ["broker-1:9092"] },
            "gateway": { "base_url": "https://settlement.internal" }
        }"#;

        let config: SystemConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.feed.topic, "fix.executions");
        assert_eq!(config.feed.events_topic, "trade.events");
        assert_eq!(config.feed.dedupe_horizon_days, 7);
        assert_eq!(config.gateway.send_ttl_secs, 86_400);
        assert_eq!(config.gateway.retry.backoff_ms_initial, 250);
        assert!(config.instruments.is_empty());
    }

    #[test]
    fn test_de_full_config() {
        let json = r#"{
            "feed": {
                "brokers": ["broker-1:9092", "broker-2:9092"],
                "topic": "fix.executions.us",
                "dedupe_horizon_days": 10
            },
            "gateway": {
                "base_url": "https://settlement.internal",
                "retry": {
                    "backoff_ms_initial": 100,
                    "backoff_multiplier": 2,
                    "backoff_ms_max": 10000,
                    "jitter_pct": 0.1
                }
            },
            "currency_scales": { "JPY": 0 },
            "instruments": [{
                "instrument_id": "inst-aapl",
                "security_type": "EQUITY",
                "isin": "US0378331005",
                "currency": "USD",
                "venue": "XNAS"
            }],
            "orders": [{
                "order_id": "O1",
                "account_id": "acct-1",
                "instrument_id": "inst-aapl",
                "side": "BUY",
                "qty": 100,
                "trader": "trader-1"
            }]
        }"#;

        let config: SystemConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.feed.topic, "fix.executions.us");
        assert_eq!(config.gateway.retry.backoff_ms_max, 10_000);
        assert_eq!(config.instruments.len(), 1);
        assert_eq!(config.orders.len(), 1);
    }
}

use derive_more::Constructor;
use fnv::FnvHashMap;
use posttrade_execution::{fill::Execution, id::ExecId};
use posttrade_instrument::calendar::{BusinessCalendar, BusinessDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Broker partition offset of an inbound message.
pub type Offset = u64;

/// Message consumed from an inbound partition.
///
/// The offset is surrendered (committed) only after the enclosing rule transaction commits, so
/// a crash between processing and commit replays the message.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct FeedMessage<T> {
    pub offset: Offset,
    pub payload: T,
}

/// Inbound event payloads.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum FeedEvent {
    /// A fill reported on the `ExecutionFeed` topic.
    Fill(Execution),

    /// A bust correction from the operator workflow, forcing the execution quantity down
    /// (zero for a full bust). Bypasses the fill dedupe set.
    Correction { exec_id: ExecId, qty: Decimal },
}

/// Tracks the last surrendered inbound offset for a worker.
///
/// On restart the worker replays from `committed + 1`; deterministic ids make the replayed
/// mutations idempotent.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct OffsetTracker {
    committed: Option<Offset>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, offset: Offset) {
        self.committed = Some(match self.committed {
            Some(committed) => committed.max(offset),
            None => offset,
        });
    }

    pub fn committed(&self) -> Option<Offset> {
        self.committed
    }
}

/// Sharded set of recently-processed `exec_id`s consulted before a fill reaches the rules.
///
/// Entries expire `horizon_days` business days after their trade date. Expiry is driven by a
/// trade-date watermark rather than wall-clock time, so replays prune identically.
#[derive(Debug)]
pub struct DedupeSet {
    shards: Vec<FnvHashMap<ExecId, BusinessDate>>,
    calendar: BusinessCalendar,
    horizon_days: u32,
    watermark: Option<BusinessDate>,
    inserts_since_prune: usize,
}

/// Inserts between watermark-driven prune passes.
const PRUNE_INTERVAL: usize = 1024;

impl DedupeSet {
    pub fn new(shard_count: usize, horizon_days: u32, calendar: BusinessCalendar) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| FnvHashMap::default()).collect(),
            calendar,
            horizon_days,
            watermark: None,
            inserts_since_prune: 0,
        }
    }

    pub fn contains(&self, exec_id: &ExecId) -> bool {
        self.shards[self.shard_index(exec_id)].contains_key(exec_id)
    }

    /// Record a processed fill, expiring `horizon_days` business days after its trade date.
    pub fn insert(&mut self, exec_id: ExecId, trade_date: BusinessDate) {
        let expiry = self.calendar.add_business_days(trade_date, self.horizon_days);
        let shard = self.shard_index(&exec_id);
        self.shards[shard].insert(exec_id, expiry);

        self.watermark = Some(match self.watermark {
            Some(watermark) => watermark.max(trade_date),
            None => trade_date,
        });

        self.inserts_since_prune += 1;
        if self.inserts_since_prune >= PRUNE_INTERVAL {
            self.prune();
        }
    }

    /// Drop entries whose expiry has passed the trade-date watermark.
    pub fn prune(&mut self) {
        self.inserts_since_prune = 0;
        let Some(watermark) = self.watermark else {
            return;
        };

        for shard in &mut self.shards {
            shard.retain(|_, expiry| *expiry >= watermark);
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(FnvHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(FnvHashMap::is_empty)
    }

    fn shard_index(&self, exec_id: &ExecId) -> usize {
        let mut hasher = fnv::FnvHasher::default();
        exec_id.0.as_str().hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }
}

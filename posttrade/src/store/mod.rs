use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use posttrade_execution::{
    allocation::Allocation,
    block::BlockTrade,
    fill::Execution,
    id::{AllocId, BlockId, ExecId, OrderId},
    order::Order,
};
use posttrade_instrument::instrument::{Instrument, name::InstrumentId};

/// Primary-key [`Table`] and single-row predicate helpers.
pub mod table;

pub use table::{StoreError, Table};

/// Transactional projection of the five pipeline tables.
///
/// All reads and writes go through a [`StoreTransaction`] opened with [`Store::begin`]; the
/// transaction holds the writer lock for its lifetime, so rules touching the same rows are
/// serialised. Dropping a transaction without committing discards every staged mutation.
#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a read-write transaction over the five tables.
    pub fn begin(&self) -> StoreTransaction<'_> {
        StoreTransaction {
            base: self.tables.write(),
            staged: StagedTables::default(),
        }
    }

    /// Read-only snapshot access, for effect-only rules and external queries.
    pub fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read()
    }
}

/// The five committed pipeline tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub instruments: Table<InstrumentId, Instrument>,
    pub orders: Table<OrderId, Order>,
    pub executions: Table<ExecId, Execution>,
    pub blocks: Table<BlockId, BlockTrade>,
    pub allocations: Table<AllocId, Allocation>,
}

impl Tables {
    pub fn instrument(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id)
    }

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn execution(&self, id: &ExecId) -> Option<&Execution> {
        self.executions.get(id)
    }

    pub fn block(&self, id: &BlockId) -> Option<&BlockTrade> {
        self.blocks.get(id)
    }

    pub fn allocation(&self, id: &AllocId) -> Option<&Allocation> {
        self.allocations.get(id)
    }

    pub fn allocations_of(&self, block: &BlockId) -> Vec<&Allocation> {
        self.allocations
            .values()
            .filter(|allocation| &allocation.block_id == block)
            .collect()
    }
}

/// Post-commit change notification, fired exactly once per committed change in mutation order.
///
/// An upsert that leaves a row bit-identical to its committed value is not a change and fires
/// no notification - this is what collapses at-least-once redelivery into at-most-once effect.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Created(TableRow),
    Updated(TableRow),
}

impl StoreEvent {
    pub fn row(&self) -> &TableRow {
        match self {
            StoreEvent::Created(row) | StoreEvent::Updated(row) => row,
        }
    }
}

/// A committed row, tagged by table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Instrument(Instrument),
    Order(Order),
    Execution(Execution),
    Block(BlockTrade),
    Allocation(Allocation),
}

/// Staged (uncommitted) mutations, keyed per table, with a cross-table log preserving first
/// mutation order for notification emission.
#[derive(Debug, Default)]
struct StagedTables {
    instruments: IndexMap<InstrumentId, Instrument>,
    orders: IndexMap<OrderId, Order>,
    executions: IndexMap<ExecId, Execution>,
    blocks: IndexMap<BlockId, BlockTrade>,
    allocations: IndexMap<AllocId, Allocation>,
    log: Vec<StagedKey>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum StagedKey {
    Instrument(InstrumentId),
    Order(OrderId),
    Execution(ExecId),
    Block(BlockId),
    Allocation(AllocId),
}

/// Read-write transaction over the [`Store`].
///
/// Mutations are staged in an overlay with read-your-writes semantics and applied atomically by
/// [`Self::commit`], which returns the post-commit [`StoreEvent`] notifications.
#[derive(Debug)]
pub struct StoreTransaction<'store> {
    base: RwLockWriteGuard<'store, Tables>,
    staged: StagedTables,
}

impl StoreTransaction<'_> {
    /// Exact instrument lookup; instruments are reference data so absence is an error.
    pub fn instrument(&self, id: &InstrumentId) -> Result<Instrument, StoreError> {
        table::txn_get(&self.base.instruments, &self.staged.instruments, id)
            .cloned()
            .ok_or(StoreError::NotFound {
                table: "instruments",
            })
    }

    /// Exact order lookup; every execution must resolve to exactly one order.
    pub fn order(&self, id: &OrderId) -> Result<Order, StoreError> {
        table::txn_get(&self.base.orders, &self.staged.orders, id)
            .cloned()
            .ok_or(StoreError::NotFound { table: "orders" })
    }

    pub fn execution(&self, id: &ExecId) -> Option<Execution> {
        table::txn_get(&self.base.executions, &self.staged.executions, id).cloned()
    }

    pub fn executions_where<P>(&self, predicate: P) -> Vec<Execution>
    where
        P: Fn(&Execution) -> bool,
    {
        table::txn_all(&self.base.executions, &self.staged.executions, predicate)
    }

    pub fn orders_where<P>(&self, predicate: P) -> Vec<Order>
    where
        P: Fn(&Order) -> bool,
    {
        table::txn_all(&self.base.orders, &self.staged.orders, predicate)
    }

    pub fn block(&self, id: &BlockId) -> Option<BlockTrade> {
        table::txn_get(&self.base.blocks, &self.staged.blocks, id).cloned()
    }

    /// The unique block matching the predicate, if any.
    ///
    /// Errors with [`StoreError::NotUnique`] on more than one match - a breach of the one
    /// open aggregation bucket invariant that must halt the worker.
    pub fn single_block_where<P>(&self, predicate: P) -> Result<Option<BlockTrade>, StoreError>
    where
        P: Fn(&BlockTrade) -> bool,
    {
        table::txn_single(&self.base.blocks, &self.staged.blocks, "blocks", predicate)
    }

    pub fn upsert_instrument(&mut self, instrument: Instrument) {
        let key = instrument.instrument_id.clone();
        if !self.staged.instruments.contains_key(&key) {
            self.staged.log.push(StagedKey::Instrument(key.clone()));
        }
        self.staged.instruments.insert(key, instrument);
    }

    pub fn upsert_order(&mut self, order: Order) {
        let key = order.order_id.clone();
        if !self.staged.orders.contains_key(&key) {
            self.staged.log.push(StagedKey::Order(key.clone()));
        }
        self.staged.orders.insert(key, order);
    }

    pub fn upsert_execution(&mut self, execution: Execution) {
        let key = execution.exec_id.clone();
        if !self.staged.executions.contains_key(&key) {
            self.staged.log.push(StagedKey::Execution(key.clone()));
        }
        self.staged.executions.insert(key, execution);
    }

    pub fn upsert_block(&mut self, block: BlockTrade) {
        let key = block.block_id.clone();
        if !self.staged.blocks.contains_key(&key) {
            self.staged.log.push(StagedKey::Block(key.clone()));
        }
        self.staged.blocks.insert(key, block);
    }

    pub fn upsert_allocation(&mut self, allocation: Allocation) {
        let key = allocation.alloc_id.clone();
        if !self.staged.allocations.contains_key(&key) {
            self.staged.log.push(StagedKey::Allocation(key.clone()));
        }
        self.staged.allocations.insert(key, allocation);
    }

    /// Apply every staged mutation atomically and return the resulting change notifications in
    /// mutation order.
    pub fn commit(mut self) -> Vec<StoreEvent> {
        let mut events = Vec::with_capacity(self.staged.log.len());

        for key in std::mem::take(&mut self.staged.log) {
            match key {
                StagedKey::Instrument(key) => {
                    if let Some(row) = self.staged.instruments.swap_remove(&key)
                        && let Some(event) =
                            apply(&mut self.base.instruments, key, row, TableRow::Instrument)
                    {
                        events.push(event);
                    }
                }
                StagedKey::Order(key) => {
                    if let Some(row) = self.staged.orders.swap_remove(&key)
                        && let Some(event) =
                            apply(&mut self.base.orders, key, row, TableRow::Order)
                    {
                        events.push(event);
                    }
                }
                StagedKey::Execution(key) => {
                    if let Some(row) = self.staged.executions.swap_remove(&key)
                        && let Some(event) =
                            apply(&mut self.base.executions, key, row, TableRow::Execution)
                    {
                        events.push(event);
                    }
                }
                StagedKey::Block(key) => {
                    if let Some(row) = self.staged.blocks.swap_remove(&key)
                        && let Some(event) =
                            apply(&mut self.base.blocks, key, row, TableRow::Block)
                    {
                        events.push(event);
                    }
                }
                StagedKey::Allocation(key) => {
                    if let Some(row) = self.staged.allocations.swap_remove(&key)
                        && let Some(event) =
                            apply(&mut self.base.allocations, key, row, TableRow::Allocation)
                    {
                        events.push(event);
                    }
                }
            }
        }

        events
    }
}

fn apply<Key, Row>(
    table: &mut Table<Key, Row>,
    key: Key,
    row: Row,
    wrap: fn(Row) -> TableRow,
) -> Option<StoreEvent>
where
    Key: Eq + std::hash::Hash,
    Row: Clone + PartialEq,
{
    match table.insert(key, row.clone()) {
        None => Some(StoreEvent::Created(wrap(row))),
        Some(prior) if prior != row => Some(StoreEvent::Updated(wrap(row))),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posttrade_instrument::{
        Side, account::AccountId, calendar::BusinessDate, instrument::name::Mic,
    };
    use rust_decimal_macros::dec;

    fn execution(exec_id: &str, qty: rust_decimal::Decimal) -> Execution {
        Execution::new(
            ExecId::new(exec_id),
            OrderId::new("O1"),
            InstrumentId::new("inst-1"),
            qty,
            dec!(10),
            BusinessDate::from_yyyymmdd(20240115).unwrap(),
            Mic::new("XNYS"),
        )
    }

    fn order(order_id: &str, account: &str) -> Order {
        Order::new(
            OrderId::new(order_id),
            AccountId::new(account),
            InstrumentId::new("inst-1"),
            Side::Buy,
            dec!(100),
            "trader-1".into(),
        )
    }

    #[test]
    fn test_txn_read_your_writes() {
        let store = Store::new();
        let mut txn = store.begin();

        txn.upsert_execution(execution("X1", dec!(100)));

        assert!(txn.execution(&ExecId::new("X1")).is_some());
        assert_eq!(txn.executions_where(|_| true).len(), 1);
    }

    #[test]
    fn test_txn_drop_discards_staged_mutations() {
        let store = Store::new();

        let mut txn = store.begin();
        txn.upsert_execution(execution("X1", dec!(100)));
        drop(txn);

        assert!(store.read().executions.is_empty());
    }

    #[test]
    fn test_commit_emits_created_then_updated() {
        let store = Store::new();

        let mut txn = store.begin();
        txn.upsert_execution(execution("X1", dec!(100)));
        let events = txn.commit();
        assert_eq!(
            events,
            vec![StoreEvent::Created(TableRow::Execution(execution(
                "X1",
                dec!(100)
            )))]
        );

        let mut txn = store.begin();
        txn.upsert_execution(execution("X1", dec!(50)));
        let events = txn.commit();
        assert_eq!(
            events,
            vec![StoreEvent::Updated(TableRow::Execution(execution(
                "X1",
                dec!(50)
            )))]
        );
    }

    #[test]
    fn test_commit_unchanged_upsert_fires_no_notification() {
        let store = Store::new();

        let mut txn = store.begin();
        txn.upsert_execution(execution("X1", dec!(100)));
        txn.commit();

        let mut txn = store.begin();
        txn.upsert_execution(execution("X1", dec!(100)));
        assert!(txn.commit().is_empty());
    }

    #[test]
    fn test_commit_preserves_cross_table_mutation_order() {
        let store = Store::new();

        let mut txn = store.begin();
        txn.upsert_order(order("O1", "acct-1"));
        txn.upsert_execution(execution("X1", dec!(100)));
        txn.upsert_order(order("O1", "acct-2"));

        let events = txn.commit();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            StoreEvent::Created(TableRow::Order(ref order)) if order.account_id == AccountId::new("acct-2")
        ));
        assert!(matches!(
            events[1],
            StoreEvent::Created(TableRow::Execution(_))
        ));
    }

    #[test]
    fn test_single_block_where_not_unique() {
        let store = Store::new();
        let mut txn = store.begin();

        let date = BusinessDate::from_yyyymmdd(20240115).unwrap();
        for block_id in ["blk-1", "blk-2"] {
            txn.upsert_block(BlockTrade::new(
                posttrade_execution::id::BlockId::new(block_id),
                InstrumentId::new("inst-1"),
                Side::Buy,
                date,
                dec!(100),
                dec!(10),
                posttrade_execution::block::BlockStatus::ReadyToAllocate,
            ));
        }

        assert_eq!(
            txn.single_block_where(|block| block.instrument_id == InstrumentId::new("inst-1")),
            Err(StoreError::NotUnique { table: "blocks" })
        );
    }

    #[test]
    fn test_order_lookup_not_found() {
        let store = Store::new();
        let txn = store.begin();
        assert_eq!(
            txn.order(&OrderId::new("missing")),
            Err(StoreError::NotFound { table: "orders" })
        );
    }
}

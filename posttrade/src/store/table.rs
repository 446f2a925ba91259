use fnv::FnvHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use thiserror::Error;

/// All store errors.
///
/// `NotUnique` is a fatal invariant breach - the worker halts rather than guess which row a
/// single-row predicate meant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error, Deserialize, Serialize)]
pub enum StoreError {
    #[error("no {table} row matches the predicate")]
    NotFound { table: &'static str },

    #[error("more than one {table} row matches a single-row predicate")]
    NotUnique { table: &'static str },
}

/// Primary-key table of one pipeline entity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Table<Key: Eq + Hash, Row> {
    rows: FnvHashMap<Key, Row>,
}

impl<Key: Eq + Hash, Row> Default for Table<Key, Row> {
    fn default() -> Self {
        Self {
            rows: FnvHashMap::default(),
        }
    }
}

impl<Key, Row> Table<Key, Row>
where
    Key: Eq + Hash,
{
    pub fn get(&self, key: &Key) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Row)> + '_ {
        self.rows.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(super) fn insert(&mut self, key: Key, row: Row) -> Option<Row> {
        self.rows.insert(key, row)
    }
}

/// Merged transaction read over a committed [`Table`] and its staged (uncommitted) overlay.
///
/// Staged rows win, giving rules read-your-writes semantics within a transaction.
pub(super) fn txn_get<'a, Key, Row>(
    base: &'a Table<Key, Row>,
    staged: &'a IndexMap<Key, Row>,
    key: &Key,
) -> Option<&'a Row>
where
    Key: Eq + Hash,
{
    staged.get(key).or_else(|| base.get(key))
}

/// All rows matching the predicate across the committed table and staged overlay.
pub(super) fn txn_all<Key, Row, P>(
    base: &Table<Key, Row>,
    staged: &IndexMap<Key, Row>,
    predicate: P,
) -> Vec<Row>
where
    Key: Eq + Hash,
    Row: Clone,
    P: Fn(&Row) -> bool,
{
    base.iter()
        .filter(|(key, _)| !staged.contains_key(*key))
        .map(|(_, row)| row)
        .chain(staged.values())
        .filter(|row| predicate(row))
        .cloned()
        .collect()
}

/// The unique row matching the predicate, if any.
///
/// Errors with [`StoreError::NotUnique`] when the predicate matches more than one row.
pub(super) fn txn_single<Key, Row, P>(
    base: &Table<Key, Row>,
    staged: &IndexMap<Key, Row>,
    table: &'static str,
    predicate: P,
) -> Result<Option<Row>, StoreError>
where
    Key: Eq + Hash,
    Row: Clone,
    P: Fn(&Row) -> bool,
{
    let mut matches = txn_all(base, staged, predicate);
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(StoreError::NotUnique { table }),
    }
}

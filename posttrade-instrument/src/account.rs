use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// Unique client account identifier.
///
/// Allocation fan-out is deterministic over accounts sorted lexicographically by `AccountId`,
/// so the derived `Ord` is load-bearing.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct AccountId(pub SmolStr);

impl AccountId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Desk trader identifier attached to an order at entry.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct TraderId(pub SmolStr);

impl TraderId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

impl From<&str> for TraderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

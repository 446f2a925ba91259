use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;

/// Unique reference-data identifier for an [`Instrument`](super::Instrument).
///
/// Opaque to the pipeline; also the inbound feed partition key, so all executions for an
/// instrument land on a single worker.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct InstrumentId(pub SmolStr);

impl InstrumentId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

impl From<&str> for InstrumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for InstrumentId {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for InstrumentId {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// International Securities Identification Number, normalised to uppercase.
///
/// eg/ "US0378331005"
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
pub struct Isin(pub SmolStr);

impl Isin {
    pub fn new<S>(isin: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let isin = isin.into();
        if isin.chars().all(|c| !c.is_lowercase()) {
            Self(isin)
        } else {
            Self(isin.to_uppercase_smolstr())
        }
    }
}

impl From<&str> for Isin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Isin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let isin = <&str>::deserialize(deserializer)?;
        Ok(Isin::new(isin))
    }
}

/// ISO 10383 Market Identifier Code for an execution venue.
///
/// eg/ "XNYS", "XLON"
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct Mic(pub SmolStr);

impl Mic {
    pub fn new<S: Into<SmolStr>>(mic: S) -> Self {
        Self(mic.into())
    }
}

impl From<&str> for Mic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

use crate::{
    currency::Currency,
    instrument::name::{InstrumentId, Isin, Mic},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Instrument name newtypes - [`InstrumentId`], [`Isin`] and [`Mic`].
pub mod name;

/// Asset class of an [`Instrument`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityType {
    Equity,
    Bond,
    Swap,
}

impl Display for SecurityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SecurityType::Equity => "EQUITY",
                SecurityType::Bond => "BOND",
                SecurityType::Swap => "SWAP",
            }
        )
    }
}

/// Static instrument reference data.
///
/// Created externally (seeded from configuration at startup) and read-only to the pipeline.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct Instrument {
    pub instrument_id: InstrumentId,
    pub security_type: SecurityType,
    pub isin: Isin,
    pub currency: Currency,
    pub venue: Mic,
}

impl Instrument {
    pub fn new<Id, I, C, V>(
        instrument_id: Id,
        security_type: SecurityType,
        isin: I,
        currency: C,
        venue: V,
    ) -> Self
    where
        Id: Into<InstrumentId>,
        I: Into<Isin>,
        C: Into<Currency>,
        V: Into<Mic>,
    {
        Self {
            instrument_id: instrument_id.into(),
            security_type,
            isin: isin.into(),
            currency: currency.into(),
            venue: venue.into(),
        }
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ instrument: {}, type: {}, isin: {}, currency: {}, venue: {} }}",
            self.instrument_id, self.security_type, self.isin, self.currency, self.venue
        )
    }
}

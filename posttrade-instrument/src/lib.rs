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

//! # Posttrade-Instrument
//! Posttrade-Instrument contains core Instrument, Account and trading-calendar reference data
//! structures shared by the post-trade processing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Account related identifiers.
///
/// eg/ `AccountId`, `TraderId`, etc.
pub mod account;

/// Trading calendar utilities - [`BusinessDate`](calendar::BusinessDate) and the
/// [`BusinessCalendar`](calendar::BusinessCalendar) used for T+N settle date arithmetic.
pub mod calendar;

/// [`Currency`](currency::Currency) identifier and the per-currency decimal scale table used
/// when rounding monetary amounts.
pub mod currency;

/// [`Instrument`](instrument::Instrument) related data structures.
///
/// eg/ `SecurityType`, `Isin`, `Mic`, etc.
pub mod instrument;

/// [`Side`] of an order or block trade - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
}

impl Side {
    /// Lowercase string representation, suitable for logging and id derivation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A trade or settlement date carried on the wire as a `YYYYMMDD` integer.
///
/// eg/ `20240115` => 2024-01-15
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BusinessDate(pub NaiveDate);

impl BusinessDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYYMMDD` integer, eg/ `20240115`.
    pub fn from_yyyymmdd(value: u32) -> Result<Self, InvalidBusinessDate> {
        let year = (value / 10_000) as i32;
        let month = (value / 100) % 100;
        let day = value % 100;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or(InvalidBusinessDate(value))
    }

    /// `YYYYMMDD` integer representation, eg/ `20240115`.
    pub fn yyyymmdd(&self) -> u32 {
        (self.0.year() as u32) * 10_000 + self.0.month() * 100 + self.0.day()
    }
}

impl Display for BusinessDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.yyyymmdd())
    }
}

impl Serialize for BusinessDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.yyyymmdd())
    }
}

impl<'de> Deserialize<'de> for BusinessDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        BusinessDate::from_yyyymmdd(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("invalid YYYYMMDD business date: {0}")]
pub struct InvalidBusinessDate(pub u32);

/// Business-day calendar used for T+N settle date arithmetic and dedupe horizon expiry.
///
/// Weekends are always non-business days; market holidays are supplied externally
/// (see `SystemConfig`).
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new<Iter>(holidays: Iter) -> Self
    where
        Iter: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Add `days` business days to the provided date, skipping weekends and holidays.
    ///
    /// eg/ T+2 settle date: `calendar.add_business_days(trade_date, 2)`
    pub fn add_business_days(&self, date: BusinessDate, days: u32) -> BusinessDate {
        let mut current = date.0;
        let mut remaining = days;

        while remaining > 0 {
            current = current
                .checked_add_days(Days::new(1))
                .expect("business date arithmetic within chrono range");
            if self.is_business_day(current) {
                remaining -= 1;
            }
        }

        BusinessDate(current)
    }
}

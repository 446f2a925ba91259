use derive_more::Display;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;

/// ISO 4217 currency code, normalised to uppercase.
///
/// eg/ "USD", "EUR", "JPY"
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Display)]
pub struct Currency(pub SmolStr);

impl Currency {
    pub fn new<S>(code: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let code = code.into();
        if code.chars().all(char::is_uppercase) {
            Self(code)
        } else {
            Self(code.to_uppercase_smolstr())
        }
    }
}

impl From<&str> for Currency {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Currency {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = <&str>::deserialize(deserializer)?;
        Ok(Currency::new(code))
    }
}

/// Per-currency decimal scale table used when rounding monetary amounts.
///
/// Currencies absent from the table round at [`CurrencyScales::DEFAULT_SCALE`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CurrencyScales(FnvHashMap<Currency, u32>);

impl CurrencyScales {
    /// Scale applied to currencies with no explicit table entry (eg/ "USD" => 2dp).
    pub const DEFAULT_SCALE: u32 = 2;

    pub fn new<Iter, C>(scales: Iter) -> Self
    where
        Iter: IntoIterator<Item = (C, u32)>,
        C: Into<Currency>,
    {
        Self(
            scales
                .into_iter()
                .map(|(currency, scale)| (currency.into(), scale))
                .collect(),
        )
    }

    pub fn scale_of(&self, currency: &Currency) -> u32 {
        self.0
            .get(currency)
            .copied()
            .unwrap_or(Self::DEFAULT_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalises_to_uppercase() {
        assert_eq!(Currency::new("usd"), Currency::new("USD"));
        assert_eq!(Currency::new("Usd").as_ref(), "USD");
    }

    #[test]
    fn test_scale_of_with_table_entry() {
        let scales = CurrencyScales::new([("JPY", 0), ("BHD", 3)]);
        assert_eq!(scales.scale_of(&Currency::new("JPY")), 0);
        assert_eq!(scales.scale_of(&Currency::new("BHD")), 3);
    }

    #[test]
    fn test_scale_of_default() {
        let scales = CurrencyScales::default();
        assert_eq!(
            scales.scale_of(&Currency::new("USD")),
            CurrencyScales::DEFAULT_SCALE
        );
    }
}

use crate::core::error::LedgerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// ISO 4217-style currency code.
///
/// The common travel currencies are listed as variants so typos in
/// well-known codes are caught at construction time. Anything else is
/// carried through [`Currency::Other`] and only matters to the rate
/// provider.
///
/// # Examples
///
/// ```
/// use sharepay_engine::core::currency::Currency;
///
/// let twd: Currency = " twd ".parse().unwrap();
/// assert_eq!(twd, Currency::TWD);
///
/// let vnd: Currency = "VND".parse().unwrap();
/// assert_eq!(vnd, Currency::Other("VND".to_string()));
/// ```
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Currency {
    #[default]
    TWD,
    JPY,
    USD,
    EUR,
    GBP,
    CNY,
    HKD,
    KRW,
    SGD,
    THB,
    AUD,
    CAD,
    CHF,
    /// Any other upper-cased code, accepted opaquely.
    Other(String),
}

impl Currency {
    /// Parse a code, upper-casing and trimming it first.
    pub fn new(code: &str) -> Result<Self, LedgerError> {
        code.parse()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Currency::TWD => "TWD",
            Currency::JPY => "JPY",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CNY => "CNY",
            Currency::HKD => "HKD",
            Currency::KRW => "KRW",
            Currency::SGD => "SGD",
            Currency::THB => "THB",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
            Currency::Other(code) => code.as_str(),
        }
    }

    /// Whether this is one of the enumerated codes.
    pub fn is_known(&self) -> bool {
        !matches!(self, Currency::Other(_))
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        let currency = match code.as_str() {
            "" => {
                return Err(LedgerError::Validation(
                    "currency code must not be empty".to_string(),
                ))
            }
            "TWD" => Currency::TWD,
            "JPY" => Currency::JPY,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "GBP" => Currency::GBP,
            "CNY" => Currency::CNY,
            "HKD" => Currency::HKD,
            "KRW" => Currency::KRW,
            "SGD" => Currency::SGD,
            "THB" => Currency::THB,
            "AUD" => Currency::AUD,
            "CAD" => Currency::CAD,
            "CHF" => Currency::CHF,
            _ => Currency::Other(code),
        };
        Ok(currency)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

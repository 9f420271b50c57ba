//! # Money Module
//!
//! Currency codes. Amounts themselves are plain `rust_decimal::Decimal`
//! values; the currency always travels next to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 currency code, normalized to upper case.
///
/// # Examples
/// ```
/// use paybank_core::Currency;
///
/// let ron = Currency::new("ron");
/// assert_eq!(ron.code(), "RON");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    // === Presets ===

    /// Romanian Leu
    pub fn ron() -> Self {
        Self::new("RON")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalized() {
        assert_eq!(Currency::new(" eur "), Currency::eur());
        assert_eq!(Currency::ron().to_string(), "RON");
    }

    #[test]
    fn test_currency_serde_as_string() {
        let json = serde_json::to_string(&Currency::usd()).unwrap();
        assert_eq!(json, "\"USD\"");

        let back: Currency = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(back, Currency::gbp());
    }
}

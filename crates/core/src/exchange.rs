//! # Exchange Module
//!
//! Static currency exchange table, loaded once at process start and read-only
//! afterwards. A missing pair means cross-currency transfers for that pair
//! are refused.

use crate::error::{CoreError, CoreResult};
use crate::money::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One directed conversion rate: `1 from = rate to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

impl ExchangeRate {
    pub fn new(from: Currency, to: Currency, rate: Decimal) -> Self {
        Self { from, to, rate }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl ExchangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of rates. Non-positive rates are rejected.
    pub fn from_rates(rates: impl IntoIterator<Item = ExchangeRate>) -> CoreResult<Self> {
        let mut table = Self::new();
        for rate in rates {
            table.insert(rate)?;
        }
        Ok(table)
    }

    /// Parse the JSON form: `[{"from": "EUR", "to": "RON", "rate": "4.97"}]`.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let rates: Vec<ExchangeRate> = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidExchangeTable(e.to_string()))?;
        Self::from_rates(rates)
    }

    pub fn insert(&mut self, rate: ExchangeRate) -> CoreResult<()> {
        if rate.rate <= Decimal::ZERO {
            return Err(CoreError::InvalidExchangeTable(format!(
                "rate {} -> {} must be positive, got {}",
                rate.from, rate.to, rate.rate
            )));
        }
        self.rates.insert((rate.from, rate.to), rate.rate);
        Ok(())
    }

    /// Rate for `from -> to`. Identity for equal currencies.
    pub fn rate(&self, from: &Currency, to: &Currency) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from.clone(), to.clone())).copied()
    }

    /// `None` when no rate is known or the product overflows.
    pub fn convert(&self, amount: Decimal, from: &Currency, to: &Currency) -> Option<Decimal> {
        self.rate(from, to).and_then(|rate| amount.checked_mul(rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_lookup_is_directed() {
        let table = ExchangeTable::from_rates([ExchangeRate::new(
            Currency::eur(),
            Currency::ron(),
            dec!(5.0),
        )])
        .unwrap();

        assert_eq!(table.rate(&Currency::eur(), &Currency::ron()), Some(dec!(5.0)));
        assert_eq!(table.rate(&Currency::ron(), &Currency::eur()), None);
        assert_eq!(table.rate(&Currency::usd(), &Currency::usd()), Some(Decimal::ONE));
        assert_eq!(
            table.convert(dec!(10), &Currency::eur(), &Currency::ron()),
            Some(dec!(50))
        );
        assert_eq!(
            table.convert(Decimal::MAX, &Currency::eur(), &Currency::ron()),
            None
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"from": "eur", "to": "RON", "rate": "4.97"},
            {"from": "USD", "to": "RON", "rate": "4.55"}
        ]"#;
        let table = ExchangeTable::from_json(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rate(&Currency::eur(), &Currency::ron()), Some(dec!(4.97)));
    }

    #[test]
    fn test_invalid_rates_rejected() {
        let err = ExchangeTable::from_json(r#"[{"from": "EUR", "to": "RON", "rate": "0"}]"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidExchangeTable(_)));

        let err = ExchangeTable::from_json("not json").unwrap_err();
        assert!(matches!(err, CoreError::InvalidExchangeTable(_)));
    }
}

//! Currency module
//!
//! Provides:
//! - ISO 4217 currency table with minor-unit digits
//! - Document exchange rates as printed on statements ("1,1448 USD/EUR")
//! - In-memory historical rate table with forward-fill, inverse lookup and
//!   cross-rate triangulation through the base currency

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::MoneyError;
use crate::pp::Money;

// =============================================================================
// Currency table
// =============================================================================

/// A known currency and the number of digits of its minor unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyUnit {
    pub code: &'static str,
    pub minor_digits: u32,
}

const CURRENCIES: &[CurrencyUnit] = &[
    CurrencyUnit { code: "EUR", minor_digits: 2 },
    CurrencyUnit { code: "USD", minor_digits: 2 },
    CurrencyUnit { code: "CHF", minor_digits: 2 },
    CurrencyUnit { code: "GBP", minor_digits: 2 },
    CurrencyUnit { code: "CAD", minor_digits: 2 },
    CurrencyUnit { code: "AUD", minor_digits: 2 },
    CurrencyUnit { code: "DKK", minor_digits: 2 },
    CurrencyUnit { code: "SEK", minor_digits: 2 },
    CurrencyUnit { code: "NOK", minor_digits: 2 },
    CurrencyUnit { code: "PLN", minor_digits: 2 },
    CurrencyUnit { code: "CZK", minor_digits: 2 },
    CurrencyUnit { code: "HKD", minor_digits: 2 },
    CurrencyUnit { code: "SGD", minor_digits: 2 },
    CurrencyUnit { code: "ZAR", minor_digits: 2 },
    CurrencyUnit { code: "MXN", minor_digits: 2 },
    CurrencyUnit { code: "JPY", minor_digits: 0 },
    CurrencyUnit { code: "KRW", minor_digits: 0 },
    CurrencyUnit { code: "HUF", minor_digits: 0 },
];

/// Look up a currency by its ISO code
pub fn currency_unit(code: &str) -> Option<&'static CurrencyUnit> {
    CURRENCIES.iter().find(|c| c.code == code)
}

pub fn is_known_currency(code: &str) -> bool {
    currency_unit(code).is_some()
}

/// Number of minor-unit digits, 2 for unknown codes
pub fn minor_digits(code: &str) -> u32 {
    currency_unit(code).map(|c| c.minor_digits).unwrap_or(2)
}

/// Factor between major and minor unit (100 for EUR, 1 for JPY)
pub fn minor_factor(code: &str) -> i64 {
    10_i64.pow(minor_digits(code))
}

// =============================================================================
// Document exchange rate
// =============================================================================

/// Exchange rate as printed in a statement.
///
/// `1 base = rate term`. For "Cambio divisa 1,1448 USD/EUR" the term currency
/// is USD and the base currency is EUR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub rate: Decimal,
    pub base: String,
    pub term: String,
}

impl ExchangeRate {
    pub fn new(rate: Decimal, base: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            rate,
            base: base.into(),
            term: term.into(),
        }
    }

    /// Multiplier turning money in the *other* currency of the pair into `currency`
    pub fn rate_for(&self, currency: &str) -> Option<Decimal> {
        if self.rate.is_zero() {
            return None;
        }
        if currency == self.term {
            Some(self.rate)
        } else if currency == self.base {
            Some(Decimal::ONE / self.rate)
        } else {
            None
        }
    }

    /// Convert money of one side of the pair into `target`
    pub fn convert(&self, target: &str, money: &Money) -> Result<Money, MoneyError> {
        if money.currency == target {
            return Ok(money.clone());
        }
        let other_side = if target == self.base { &self.term } else { &self.base };
        if money.currency != *other_side {
            return Err(MoneyError::CurrencyMismatch {
                left: money.currency.clone(),
                right: target.to_string(),
            });
        }
        let rate = self
            .rate_for(target)
            .ok_or_else(|| MoneyError::InvalidRate(self.rate.to_string()))?;
        money.convert(rate, target)
    }
}

// =============================================================================
// Historical rate table
// =============================================================================

/// Historical exchange rates taken from the ledger.
///
/// Rates are stored as `base → term` series. Lookups forward-fill from the
/// latest date on or before the requested date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateTable {
    series: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
}

fn series_key(base: &str, term: &str) -> String {
    format!("{}/{}", base, term)
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, base: &str, term: &str, date: NaiveDate, rate: Decimal) {
        self.series
            .entry(series_key(base, term))
            .or_default()
            .insert(date, rate);
    }

    /// Get exchange rate for a currency pair on a specific date.
    /// `amount_in_base * rate = amount_in_term`.
    pub fn get_rate(&self, base: &str, term: &str, date: NaiveDate, pivot: &str) -> Option<Decimal> {
        if base == term {
            return Some(Decimal::ONE);
        }

        // Try direct rate first
        if let Some(rate) = self.lookup(base, term, date) {
            return Some(rate);
        }

        // Try inverse rate
        if let Some(rate) = self.lookup(term, base, date) {
            if let Some(inverse) = Decimal::ONE.checked_div(rate) {
                return Some(inverse);
            }
        }

        // Triangulate through the pivot currency
        if base != pivot && term != pivot {
            let base_to_pivot = self.get_rate(base, pivot, date, pivot)?;
            let pivot_to_term = self.get_rate(pivot, term, date, pivot)?;
            return base_to_pivot.checked_mul(pivot_to_term);
        }

        None
    }

    /// Look up rate with forward-fill
    fn lookup(&self, base: &str, term: &str, date: NaiveDate) -> Option<Decimal> {
        self.series
            .get(&series_key(base, term))?
            .range(..=date)
            .next_back()
            .map(|(_, rate)| *rate)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

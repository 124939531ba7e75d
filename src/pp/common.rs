//! Common types shared across the Portfolio Performance data model.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

use crate::currency::minor_digits;
use crate::error::MoneyError;

/// Factor for converting shares (PP stores shares * 10^8)
pub const SHARES_FACTOR: i64 = 100_000_000;

/// Monetary amount with currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in smallest currency units (e.g., cents for EUR, yen for JPY)
    pub amount: i64,
    /// ISO 4217 currency code (e.g., "EUR", "USD")
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Create a zero-value Money in the given currency
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Exact decimal value in major units (e.g., cents to euros)
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, minor_digits(&self.currency))
    }

    /// Create from a major-unit decimal, rounding half-up to the minor unit
    pub fn from_decimal(value: Decimal, currency: impl Into<String>) -> Result<Self, MoneyError> {
        Self::from_decimal_rounded(value, currency, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Create from a major-unit decimal with an explicit rounding strategy
    pub fn from_decimal_rounded(
        value: Decimal,
        currency: impl Into<String>,
        strategy: RoundingStrategy,
    ) -> Result<Self, MoneyError> {
        let currency = currency.into();
        let scaled = value.round_dp_with_strategy(minor_digits(&currency), strategy);
        let minor = scaled
            .checked_mul(Decimal::from(10_i64.pow(minor_digits(&currency))))
            .and_then(|v| v.to_i64())
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(minor, currency))
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    pub fn abs(&self) -> Money {
        Self::new(self.amount.abs(), self.currency.clone())
    }

    fn check_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }

    /// Add another Money (must be same currency)
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Subtract another Money (must be same currency)
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.check_currency(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Convert into `target` with `rate` (1 unit of self = rate units of target).
    ///
    /// Rounds half-up to the target currency's minor unit.
    pub fn convert(&self, rate: Decimal, target: &str) -> Result<Money, MoneyError> {
        if rate <= Decimal::ZERO {
            return Err(MoneyError::InvalidRate(rate.to_string()));
        }
        let value = self
            .to_decimal()
            .checked_mul(rate)
            .ok_or(MoneyError::Overflow)?;
        Self::from_decimal(value, target)
    }
}

/// Sum of two optional amounts. Currencies must agree when both are present.
pub fn add_optional(a: Option<&Money>, b: Option<&Money>) -> Result<Option<Money>, MoneyError> {
    match (a, b) {
        (Some(a), Some(b)) => a.add(b).map(Some),
        (Some(m), None) | (None, Some(m)) => Ok(Some(m.clone())),
        (None, None) => Ok(None),
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.currency, self.to_decimal())
    }
}

/// Forex conversion information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForexInfo {
    /// Amount in foreign currency (smallest units)
    pub amount: Money,
    /// Multiplier from the foreign amount to the unit amount
    pub exchange_rate: Decimal,
}

impl ForexInfo {
    pub fn new(amount: Money, exchange_rate: Decimal) -> Self {
        Self {
            amount,
            exchange_rate,
        }
    }

    /// The foreign amount converted with the stored rate
    pub fn converted(&self, target: &str) -> Result<Money, MoneyError> {
        self.amount.convert(self.exchange_rate, target)
    }
}

/// Helper functions for share conversions
pub mod shares {
    use super::SHARES_FACTOR;
    use rust_decimal::prelude::*;
    use rust_decimal::RoundingStrategy;

    /// Convert from PP internal format (shares * 10^8) to decimal
    pub fn to_decimal(shares: i64) -> Decimal {
        Decimal::new(shares, 8)
    }

    /// Convert from decimal to PP internal format (shares * 10^8)
    pub fn from_decimal(shares: Decimal) -> Option<i64> {
        shares
            .checked_mul(Decimal::from(SHARES_FACTOR))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

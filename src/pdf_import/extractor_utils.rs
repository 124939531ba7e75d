//! Conversion helpers shared by all grammars: locale-aware numbers, dates,
//! and the fee/tax/gross-value bookkeeping of foreign-currency drafts.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

use super::parser::{BlockContext, Draft, Section};
use crate::error::FieldError;
use crate::pp::{shares, ForexInfo, Money, TransactionUnit, UnitType};

/// Grouping and decimal separators of a document locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFormat {
    /// 1.234,56
    German,
    /// 1,234.56
    English,
    /// 1'234.56
    Swiss,
    /// 1 234,56
    French,
}

impl NumberFormat {
    /// Parse a number as printed in the document. Signs are kept.
    pub fn parse_decimal(&self, field: &str, value: &str) -> Result<Decimal, FieldError> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let normalized = match self {
            Self::German => compact.replace('.', "").replace(',', "."),
            Self::English => compact.replace(',', ""),
            Self::Swiss => compact.replace(['\'', '’'], ""),
            Self::French => compact.replace('.', "").replace(',', "."),
        };
        let normalized = normalized.trim_start_matches('+');
        Decimal::from_str(normalized).map_err(|e| FieldError::malformed(field, value, e.to_string()))
    }

    /// Non-negative money in `currency`, rounded half-up to its minor unit
    pub fn as_amount(&self, field: &str, value: &str, currency: &str) -> Result<Money, FieldError> {
        let decimal = self.parse_decimal(field, value)?.abs();
        Money::from_decimal(decimal, currency).map_err(|e| FieldError::malformed(field, value, e.to_string()))
    }

    /// Non-negative share count scaled by 10^8
    pub fn as_shares(&self, field: &str, value: &str) -> Result<i64, FieldError> {
        let decimal = self.parse_decimal(field, value)?.abs();
        shares::from_decimal(decimal).ok_or_else(|| FieldError::malformed(field, value, "share count out of range"))
    }

    pub fn as_exchange_rate(&self, field: &str, value: &str) -> Result<Decimal, FieldError> {
        let rate = self.parse_decimal(field, value)?;
        if rate <= Decimal::ZERO {
            return Err(FieldError::malformed(field, value, "exchange rate must be positive"));
        }
        Ok(rate)
    }
}

/// Three-letter currency code, upper-cased
pub fn as_currency_code(field: &str, value: &str) -> Result<String, FieldError> {
    let code = value.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(FieldError::malformed(field, value, "not a currency code"));
    }
    Ok(code)
}

/// Date at start of day, trying each format in order
pub fn as_date(field: &str, value: &str, formats: &[&str]) -> Result<NaiveDateTime, FieldError> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value.trim(), f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| FieldError::malformed(field, value, "not a valid date"))
}

/// Date plus time of day ("16:50:47", "16.50.47", "16:50")
pub fn as_date_time(field: &str, date: &str, time: &str, formats: &[&str]) -> Result<NaiveDateTime, FieldError> {
    let day = as_date(field, date, formats)?.date();
    let time = ["%H:%M:%S", "%H.%M.%S", "%H:%M", "%H.%M"]
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(time.trim(), f).ok())
        .ok_or_else(|| FieldError::malformed(field, time, "not a valid time"))?;
    Ok(day.and_time(time))
}

/// Record the gross value in the security currency when the draft is
/// settled in another currency and the block printed a rate.
pub fn check_and_set_gross_unit(draft: &mut Draft, gross: Money, fx_gross: Money, ctx: &BlockContext) {
    if draft.currency() == draft.security_currency() {
        return;
    }
    let Some(rate) = ctx.exchange_rate.as_ref().and_then(|r| r.rate_for(&gross.currency)) else {
        return;
    };
    draft.add_unit(TransactionUnit::gross_value(gross).with_forex(ForexInfo::new(fx_gross, rate)));
}

pub fn check_and_set_fee(draft: &mut Draft, fee: Money, ctx: &BlockContext) {
    check_and_set_cost(draft, UnitType::Fee, fee, ctx);
}

pub fn check_and_set_tax(draft: &mut Draft, tax: Money, ctx: &BlockContext) {
    check_and_set_cost(draft, UnitType::Tax, tax, ctx);
}

/// Fees and taxes in a foreign currency are converted with the block rate.
/// Without a rate they cannot be booked and are dropped.
fn check_and_set_cost(draft: &mut Draft, unit_type: UnitType, cost: Money, ctx: &BlockContext) {
    if cost.is_zero() {
        return;
    }
    let Some(currency) = draft.currency().map(str::to_string) else {
        draft.add_unit(TransactionUnit::new(unit_type, cost));
        return;
    };
    if cost.currency == currency {
        draft.add_unit(TransactionUnit::new(unit_type, cost));
        return;
    }

    let Some(rate) = &ctx.exchange_rate else {
        log::debug!("{} {} dropped: no exchange rate to {}", unit_type.as_str(), cost, currency);
        return;
    };
    let converted = match rate.convert(&currency, &cost) {
        Ok(converted) => converted,
        Err(e) => {
            log::debug!("{} {} dropped: {}", unit_type.as_str(), cost, e);
            return;
        }
    };

    let unit = TransactionUnit::new(unit_type, converted);
    let unit = match rate.rate_for(&currency) {
        Some(r) if draft.security_currency() != Some(currency.as_str()) => {
            unit.with_forex(ForexInfo::new(cost, r))
        }
        _ => unit,
    };
    draft.add_unit(unit);
}

/// Optional section booking the `amount` captured with `currency` as a fee
pub fn fee_section(pattern: &str) -> Section {
    cost_section(pattern, UnitType::Fee)
}

/// Optional section booking the `amount` captured with `currency` as a tax
pub fn tax_section(pattern: &str) -> Section {
    cost_section(pattern, UnitType::Tax)
}

fn cost_section(pattern: &str, unit_type: UnitType) -> Section {
    Section::new(&["currency", "amount"])
        .optional()
        .match_line(pattern)
        .assign(move |t, v, ctx| {
            check_and_set_cost(t, unit_type, v.money("currency", "amount")?, ctx);
            Ok(())
        })
}

/// Align a stated GROSS_VALUE unit with the gross value derived from amount,
/// fees and taxes. A rounding difference keeps the forex amount; anything
/// larger recomputes it from the rate (half-even).
pub fn fix_gross_value(draft: &mut Draft) {
    let (Some(currency), Some(security_currency)) = (draft.currency(), draft.security_currency()) else {
        return;
    };
    if currency == security_currency {
        return;
    }
    let Some(stated) = draft.unit(UnitType::GrossValue).cloned() else {
        return;
    };
    let Some(forex) = stated.forex.clone() else {
        return;
    };
    let Ok(Some(expected)) = draft.gross_value() else {
        return;
    };
    if stated.amount == expected {
        return;
    }

    let candidate = TransactionUnit::gross_value(expected.clone()).with_forex(forex.clone());
    let unit = if candidate.is_forex_consistent(1) {
        candidate
    } else {
        let Some(recomputed) = expected.to_decimal().checked_div(forex.exchange_rate) else {
            return;
        };
        let strategy = RoundingStrategy::MidpointNearestEven;
        match Money::from_decimal_rounded(recomputed, forex.amount.currency.clone(), strategy) {
            Ok(amount) => {
                TransactionUnit::gross_value(expected).with_forex(ForexInfo::new(amount, forex.exchange_rate))
            }
            Err(e) => {
                log::debug!("Gross value not adjusted: {}", e);
                return;
            }
        }
    };

    draft.remove_units(UnitType::GrossValue);
    draft.add_unit(unit);
}

/// The printed rate if it turns `forex` into `gross`, else its inverse if
/// that does, else the rate implied by the two amounts.
pub fn consistent_rate(gross: &Money, forex: &Money, stated: Decimal) -> Decimal {
    let fits = |rate: Decimal| {
        TransactionUnit::gross_value(gross.clone())
            .with_forex(ForexInfo::new(forex.clone(), rate))
            .is_forex_consistent(1)
    };
    if fits(stated) {
        return stated;
    }
    if let Some(inverse) = Decimal::ONE.checked_div(stated).filter(|r| fits(*r)) {
        return inverse;
    }
    gross.to_decimal().checked_div(forex.to_decimal()).unwrap_or(stated)
}

//! Column access shared by the CSV extractors.

use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;

use super::definition::{ColumnFormat, CsvField, CsvImportDefinition};
use crate::currency::is_known_currency;
use crate::error::{ConfigError, ExtractionError, FieldError};
use crate::models::{ExtractionResult, Item, ItemKind, SecurityDraft};
use crate::pdf_import::extractor_utils::{as_date, as_date_time};
use crate::pdf_import::NumberFormat;
use crate::pp::{ForexInfo, Money, Transaction, TransactionUnit, UnitType};

/// A validated definition plus its compiled type labels
pub struct Columns<'d> {
    pub definition: &'d CsvImportDefinition,
    type_labels: Vec<(Regex, String)>,
}

impl<'d> Columns<'d> {
    pub fn new(definition: &'d CsvImportDefinition) -> Result<Self, ConfigError> {
        definition.validate()?;

        let mut type_labels = Vec::new();
        if let Some(ColumnFormat::TypeMap { labels }) =
            definition.column(CsvField::Type).and_then(|c| c.format.as_ref())
        {
            for label in labels {
                let regex = RegexBuilder::new(&label.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::Invalid {
                        field: "typeMap",
                        reason: format!("{}: {}", label.pattern, e),
                    })?;
                type_labels.push((regex, label.transaction_type.clone()));
            }
        }

        Ok(Self {
            definition,
            type_labels,
        })
    }

    /// Run `extract_row` over the data rows of `source`. Blank rows are
    /// skipped and a failing row becomes a row error.
    pub fn extract_each<F>(&self, source: &str, rows: &[Vec<String>], extract_row: F) -> ExtractionResult
    where
        F: Fn(&[String]) -> Result<ItemKind, FieldError>,
    {
        let mut result = ExtractionResult::default();
        let skip = usize::from(self.definition.has_header);

        for (index, row) in rows.iter().enumerate().skip(skip) {
            if row.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            match extract_row(row) {
                Ok(kind) => result.items.push(Item::new(kind, source)),
                Err(e) => {
                    log::warn!("CSV Import: {} row {}: {}", source, index + 1, e);
                    result.errors.push(ExtractionError::Row {
                        document: source.to_string(),
                        row: index + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "CSV Import: {} {} rows, {} items, {} errors",
            self.definition.target.as_str(),
            rows.len().saturating_sub(skip),
            result.items.len(),
            result.errors.len()
        );
        result
    }

    pub fn text<'r>(&self, row: &'r [String], field: CsvField) -> Option<&'r str> {
        let column = self.definition.column(field)?;
        row.get(column.index).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn owned(&self, row: &[String], field: CsvField) -> Option<String> {
        self.text(row, field).map(str::to_string)
    }

    fn number_format(&self, field: CsvField) -> NumberFormat {
        match self.definition.column(field).and_then(|c| c.format.as_ref()) {
            Some(ColumnFormat::Number { format }) => *format,
            _ => self.definition.number_format,
        }
    }

    pub fn decimal(&self, row: &[String], field: CsvField) -> Result<Option<Decimal>, FieldError> {
        self.text(row, field)
            .map(|v| self.number_format(field).parse_decimal(field.as_str(), v))
            .transpose()
    }

    pub fn shares(&self, row: &[String]) -> Result<Option<i64>, FieldError> {
        self.text(row, CsvField::Shares)
            .map(|v| self.number_format(CsvField::Shares).as_shares(CsvField::Shares.as_str(), v))
            .transpose()
    }

    /// Currency code of the column; unknown or missing codes fall back to
    /// the definition's default currency
    pub fn currency(&self, row: &[String], field: CsvField) -> String {
        self.text(row, field)
            .map(|v| v.to_uppercase())
            .filter(|code| is_known_currency(code))
            .unwrap_or_else(|| self.definition.default_currency.clone())
    }

    pub fn date(&self, row: &[String]) -> Result<NaiveDateTime, FieldError> {
        let date = self.text(row, CsvField::Date).ok_or_else(|| missing(CsvField::Date))?;
        let pattern = match self.definition.column(CsvField::Date).and_then(|c| c.format.as_ref()) {
            Some(ColumnFormat::Date { pattern }) => vec![pattern.as_str()],
            _ => self.definition.date_formats.iter().map(String::as_str).collect(),
        };
        match self.text(row, CsvField::Time) {
            Some(time) => as_date_time(CsvField::Date.as_str(), date, time, &pattern),
            None => as_date(CsvField::Date.as_str(), date, &pattern),
        }
    }

    /// Type name of the row: the first matching type label, else the cell
    /// itself. `None` without a type cell.
    pub fn type_name<'r>(&'r self, row: &'r [String]) -> Option<&'r str> {
        let label = self.text(row, CsvField::Type)?;
        Some(
            self.type_labels
                .iter()
                .find(|(regex, _)| regex.is_match(label))
                .map(|(_, name)| name.as_str())
                .unwrap_or(label),
        )
    }

    /// Security from the identifier columns, `None` when no identifier is
    /// set. The forex gross currency is taken as its trading currency when
    /// present.
    pub fn security(&self, row: &[String]) -> Option<SecurityDraft> {
        let currency = if self.text(row, CsvField::CurrencyGross).is_some() {
            self.currency(row, CsvField::CurrencyGross)
        } else {
            self.currency(row, CsvField::Currency)
        };
        let security = SecurityDraft {
            isin: self.owned(row, CsvField::Isin),
            wkn: self.owned(row, CsvField::Wkn),
            ticker: self.owned(row, CsvField::Ticker),
            name: self.owned(row, CsvField::Name),
            ..SecurityDraft::new(currency)
        };
        security.is_identified().then_some(security)
    }

    pub fn required_security(&self, row: &[String]) -> Result<SecurityDraft, FieldError> {
        self.security(row)
            .ok_or_else(|| FieldError::Missing("security (isin, ticker, wkn or name)".to_string()))
    }

    /// Fee, tax and gross value units in the transaction currency
    pub fn add_units(
        &self,
        row: &[String],
        transaction: &mut dyn Transaction,
        security: Option<&SecurityDraft>,
    ) -> Result<(), FieldError> {
        let currency = transaction.currency().to_string();
        let stated_gross = self.stated_gross(row, &currency)?;

        for (field, unit_type) in [(CsvField::Fees, UnitType::Fee), (CsvField::Taxes, UnitType::Tax)] {
            if let Some(value) = self.decimal(row, field)?.filter(|v| !v.is_zero()) {
                transaction.add_unit(TransactionUnit::new(unit_type, Money::from_decimal(value.abs(), &currency)?));
            }
        }

        match (stated_gross, security) {
            (Some(unit), _) => transaction.add_unit(unit),
            (None, Some(security)) => self.implied_gross(row, transaction, security)?,
            (None, None) => {}
        }
        Ok(())
    }

    /// Gross value from the gross and gross currency columns, converted
    /// into `currency` with the exchange rate column
    pub fn stated_gross(&self, row: &[String], currency: &str) -> Result<Option<TransactionUnit>, FieldError> {
        let (Some(gross), Some(_), Some(rate)) = (
            self.decimal(row, CsvField::Gross)?,
            self.text(row, CsvField::CurrencyGross),
            self.decimal(row, CsvField::ExchangeRate)?,
        ) else {
            return Ok(None);
        };
        let forex_currency = self.currency(row, CsvField::CurrencyGross);
        if rate <= Decimal::ZERO || forex_currency == currency {
            return Ok(None);
        }

        let forex = Money::from_decimal(gross.abs(), forex_currency)?;
        let converted = gross
            .abs()
            .checked_mul(rate)
            .ok_or_else(|| FieldError::malformed(CsvField::Gross.as_str(), &gross.to_string(), "amount overflow"))?;
        let converted = Money::from_decimal(converted, currency)?;
        Ok(Some(TransactionUnit::gross_value(converted).with_forex(ForexInfo::new(forex, rate))))
    }

    /// Without a stated gross value, a rate column still gives the forex
    /// amount of a security quoted in another currency. The column rate
    /// converts transaction currency into security currency.
    fn implied_gross(
        &self,
        row: &[String],
        transaction: &mut dyn Transaction,
        security: &SecurityDraft,
    ) -> Result<(), FieldError> {
        if security.currency == transaction.currency() {
            return Ok(());
        }
        let Some(rate) = self.decimal(row, CsvField::ExchangeRate)?.filter(|r| *r > Decimal::ZERO) else {
            return Ok(());
        };

        let gross = transaction.gross_value()?;
        let overflow = || FieldError::malformed(CsvField::ExchangeRate.as_str(), &rate.to_string(), "amount overflow");
        let forex = gross.to_decimal().checked_mul(rate).ok_or_else(overflow)?;
        let forex = Money::from_decimal(forex, &security.currency)?;
        let inverse = Decimal::ONE.checked_div(rate).ok_or_else(overflow)?.round_dp(10);
        transaction.add_unit(TransactionUnit::gross_value(gross).with_forex(ForexInfo::new(forex, inverse)));
        Ok(())
    }
}

pub fn missing(field: CsvField) -> FieldError {
    FieldError::Missing(field.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_import::definition::{CsvTarget, TypeLabel};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_type_name_prefers_labels() {
        let definition = CsvImportDefinition::for_target(CsvTarget::AccountTransactions)
            .with_column(0, CsvField::Date)
            .with_column(1, CsvField::Value)
            .with_formatted_column(
                2,
                CsvField::Type,
                ColumnFormat::TypeMap {
                    labels: vec![
                        TypeLabel {
                            pattern: "^Gebührenerstattung".to_string(),
                            transaction_type: "FEES_REFUND".to_string(),
                        },
                        TypeLabel {
                            pattern: "^Gebühren".to_string(),
                            transaction_type: "FEES".to_string(),
                        },
                    ],
                },
            );
        let columns = Columns::new(&definition).unwrap();

        assert_eq!(columns.type_name(&row(&["", "", "Gebührenerstattung Mai"])), Some("FEES_REFUND"));
        assert_eq!(columns.type_name(&row(&["", "", "gebühren"])), Some("FEES"));
        assert_eq!(columns.type_name(&row(&["", "", "INTEREST"])), Some("INTEREST"));
        assert_eq!(columns.type_name(&row(&["", "", " "])), None);
    }

    #[test]
    fn test_values_are_trimmed() {
        let definition = CsvImportDefinition::for_target(CsvTarget::Securities)
            .with_column(0, CsvField::Isin)
            .with_column(1, CsvField::Currency);
        let columns = Columns::new(&definition).unwrap();

        let security = columns.security(&row(&[" DE0007164600 ", " usd "])).unwrap();
        assert_eq!(security.isin.as_deref(), Some("DE0007164600"));
        assert_eq!(security.currency, "USD");
        assert!(columns.security(&row(&["", "USD"])).is_none());
    }
}

//! Portfolio transaction rows.
//!
//! Every row yields one buy/sell entry, portfolio transfer or delivery.
//! A failing row is reported with its line number; the others continue.

use super::account::AccountCsvExtractor;
use super::columns::{missing, Columns};
use super::definition::{CsvField, CsvImportDefinition, CsvTarget};
use super::securities::SecurityCsvExtractor;
use crate::error::{ConfigError, ExtractionError, FieldError};
use crate::models::{new_uuid, BuySellEntry, ExtractionResult, ItemKind, PortfolioEntry, PortfolioTransferEntry};
use crate::pdf_import::with_security_items;
use crate::pp::{Money, PortfolioTransaction, PortfolioTransactionType};

pub struct CsvExtractor<'d> {
    columns: Columns<'d>,
}

impl<'d> CsvExtractor<'d> {
    pub fn new(definition: &'d CsvImportDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            columns: Columns::new(definition)?,
        })
    }

    /// Extract pre-tokenized rows of the file `source`
    pub fn extract(&self, source: &str, rows: &[Vec<String>]) -> ExtractionResult {
        let mut result = self.columns.extract_each(source, rows, |row| self.extract_row(row));
        result.items = with_security_items(result.items);
        result
    }

    fn extract_row(&self, row: &[String]) -> Result<ItemKind, FieldError> {
        let columns = &self.columns;
        let security = columns.required_security(row)?;

        let value = columns.decimal(row, CsvField::Value)?.ok_or_else(|| missing(CsvField::Value))?;
        let currency = columns.currency(row, CsvField::Currency);
        let amount = Money::from_decimal(value.abs(), &currency)?;
        let tx_type = self.transaction_type(row, value.is_sign_negative())?;

        let date = columns.date(row)?;
        let shares = columns.shares(row)?.ok_or_else(|| missing(CsvField::Shares))?;
        let note = columns.owned(row, CsvField::Note);

        let kind = match tx_type {
            PortfolioTransactionType::Buy | PortfolioTransactionType::Sell => {
                let mut entry = BuySellEntry::new(tx_type, date, amount, shares, security.clone());
                columns.add_units(row, &mut entry.portfolio_transaction, Some(&security))?;
                entry.portfolio_transaction.note = note.clone();
                entry.account_transaction.note = note;
                ItemKind::BuySell(entry)
            }
            PortfolioTransactionType::TransferIn | PortfolioTransactionType::TransferOut => {
                let mut entry = PortfolioTransferEntry::new(date, amount, shares, security);
                entry.source.note = note.clone();
                entry.target.note = note;
                ItemKind::PortfolioTransfer(entry)
            }
            PortfolioTransactionType::DeliveryInbound | PortfolioTransactionType::DeliveryOutbound => {
                let mut transaction = PortfolioTransaction::new(new_uuid(), date, tx_type, amount, shares);
                columns.add_units(row, &mut transaction, Some(&security))?;
                transaction.note = note;
                ItemKind::PortfolioTransaction(PortfolioEntry { transaction, security })
            }
        };
        Ok(kind)
    }

    fn transaction_type(&self, row: &[String], negative: bool) -> Result<PortfolioTransactionType, FieldError> {
        let Some(name) = self.columns.type_name(row) else {
            return Ok(if negative {
                PortfolioTransactionType::Buy
            } else {
                PortfolioTransactionType::Sell
            });
        };
        PortfolioTransactionType::from_str(name)
            .ok_or_else(|| FieldError::malformed(CsvField::Type.as_str(), name, "unsupported transaction type"))
    }
}

fn extract_with_target(
    definition: &CsvImportDefinition,
    source: &str,
    rows: &[Vec<String>],
) -> Result<ExtractionResult, ConfigError> {
    Ok(match definition.target {
        CsvTarget::PortfolioTransactions => CsvExtractor::new(definition)?.extract(source, rows),
        CsvTarget::AccountTransactions => AccountCsvExtractor::new(definition)?.extract(source, rows),
        CsvTarget::Securities => SecurityCsvExtractor::new(definition)?.extract(source, rows),
    })
}

/// Extract rows with the extractor of the definition's target, reporting an
/// invalid definition as a single error for the whole file
pub fn extract_rows(definition: &CsvImportDefinition, source: &str, rows: &[Vec<String>]) -> ExtractionResult {
    match extract_with_target(definition, source, rows) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("CSV Import: invalid definition for {}: {}", source, e);
            ExtractionResult {
                errors: vec![ExtractionError::Unreadable {
                    document: source.to_string(),
                    reason: e.to_string(),
                }],
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_import::definition::{ColumnFormat, TypeLabel};
    use crate::pp::{Transaction, UnitType};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.split(';').map(str::to_string).collect())
            .collect()
    }

    fn definition() -> CsvImportDefinition {
        CsvImportDefinition::default()
            .with_column(0, CsvField::Date)
            .with_column(1, CsvField::Isin)
            .with_column(2, CsvField::Name)
            .with_column(3, CsvField::Value)
            .with_column(4, CsvField::Currency)
            .with_column(5, CsvField::Shares)
            .with_column(6, CsvField::Fees)
            .with_column(7, CsvField::Taxes)
            .with_column(8, CsvField::Note)
    }

    #[test]
    fn test_type_inferred_from_sign() {
        let definition = definition();
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&[
                "Datum;ISIN;Name;Betrag;Währung;Stück;Gebühren;Steuern;Notiz",
                "2025-03-14;DE0007164600;SAP SE;-1.234,50;EUR;10;4,90;;Sparplan",
                "14.04.2025;DE0007164600;SAP SE;1.450,00;EUR;5;4,90;12,34;",
            ]),
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        // one security item, then the two entries
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].type_str(), "SECURITY");

        let ItemKind::BuySell(buy) = &result.items[1].kind else {
            panic!("expected buy");
        };
        let tx = &buy.portfolio_transaction;
        assert_eq!(tx.transaction_type, PortfolioTransactionType::Buy);
        assert_eq!(tx.amount, Money::new(123450, "EUR"));
        assert_eq!(tx.shares, 1_000_000_000);
        assert_eq!(tx.total_fees().unwrap(), 490);
        assert_eq!(tx.note.as_deref(), Some("Sparplan"));
        assert_eq!(tx.date.to_string(), "2025-03-14 00:00:00");

        let ItemKind::BuySell(sell) = &result.items[2].kind else {
            panic!("expected sell");
        };
        assert_eq!(sell.portfolio_transaction.transaction_type, PortfolioTransactionType::Sell);
        assert_eq!(sell.portfolio_transaction.total_taxes().unwrap(), 1234);
        assert_eq!(sell.portfolio_transaction.gross_value().unwrap(), Money::new(146724, "EUR"));
        assert_eq!(result.items[2].source, "depot.csv");
    }

    #[test]
    fn test_type_map_and_deliveries() {
        let definition = definition().with_formatted_column(
            9,
            CsvField::Type,
            ColumnFormat::TypeMap {
                labels: vec![
                    TypeLabel {
                        pattern: "^einlieferung".to_string(),
                        transaction_type: "DELIVERY_INBOUND".to_string(),
                    },
                    TypeLabel {
                        pattern: "übertrag".to_string(),
                        transaction_type: "TRANSFER_IN".to_string(),
                    },
                ],
            },
        );
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&[
                "header",
                "2025-01-02;IE00B4L5Y983;iShares Core MSCI World;800,00;EUR;10;;;;Einlieferung",
                "2025-01-03;IE00B4L5Y983;iShares Core MSCI World;800,00;EUR;10;;;;Depotübertrag",
                "2025-01-04;IE00B4L5Y983;iShares Core MSCI World;800,00;EUR;10;;;;sell",
            ]),
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let types: Vec<&str> = result.transaction_items().map(|i| i.type_str()).collect();
        assert_eq!(types, vec!["DELIVERY_INBOUND", "PORTFOLIO_TRANSFER", "SELL"]);
    }

    #[test]
    fn test_row_errors_do_not_stop_the_file() {
        let definition = definition();
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&[
                "header",
                "2025-03-14;;;-100,00;EUR;1;;;",
                "kein Datum;DE0007164600;SAP SE;-100,00;EUR;1;;;",
                "",
                "2025-03-14;DE0007164600;SAP SE;-100,00;EUR;1;;;",
            ]),
        );
        assert_eq!(result.transaction_items().count(), 1);
        assert_eq!(result.errors.len(), 2);

        let ExtractionError::Row { row, reason, .. } = &result.errors[0] else {
            panic!("expected row error");
        };
        assert_eq!(*row, 2);
        assert!(reason.contains("security"));
        assert!(matches!(result.errors[1], ExtractionError::Row { row: 3, .. }));
    }

    #[test]
    fn test_stated_gross_in_forex() {
        let definition = definition()
            .with_column(9, CsvField::Gross)
            .with_column(10, CsvField::CurrencyGross)
            .with_column(11, CsvField::ExchangeRate);
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&[
                "header",
                "2025-05-02;US0378331005;Apple Inc.;-1.905,00;EUR;10;5,00;;;2.000,00;USD;0,95",
            ]),
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let item = result.transaction_items().next().unwrap();
        assert_eq!(item.security().unwrap().currency, "USD");

        let (_, tx) = item.primary_leg().unwrap();
        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(190000, "EUR"));
        let forex = gross.forex.as_ref().unwrap();
        assert_eq!(forex.amount, Money::new(200000, "USD"));
        assert_eq!(forex.exchange_rate, dec!(0.95));
    }

    #[test]
    fn test_rate_column_alone_keeps_transaction_currency() {
        let definition = definition().with_column(9, CsvField::ExchangeRate);
        // without a gross currency column the security is quoted in the
        // transaction currency
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&["header", "2025-05-02;US0378331005;Apple Inc.;-1.005,00;EUR;10;5,00;;;1,25"]),
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let item = result.transaction_items().next().unwrap();
        assert_eq!(item.security().unwrap().currency, "EUR");
        let (_, tx) = item.primary_leg().unwrap();
        assert!(tx.unit(UnitType::GrossValue).is_none());
    }

    #[test]
    fn test_implied_gross_for_foreign_security() {
        let definition = definition()
            .with_column(9, CsvField::ExchangeRate)
            .with_column(10, CsvField::CurrencyGross);
        // gross currency column present but no gross amount: only the
        // security currency is taken from it
        let result = extract_rows(
            &definition,
            "depot.csv",
            &rows(&["header", "2025-05-02;US0378331005;Apple Inc.;-1.005,00;EUR;10;5,00;;;1,25;USD"]),
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let item = result.transaction_items().next().unwrap();
        let (_, tx) = item.primary_leg().unwrap();
        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(100000, "EUR"));
        let forex = gross.forex.as_ref().unwrap();
        assert_eq!(forex.amount, Money::new(125000, "USD"));
        assert_eq!(forex.exchange_rate, dec!(0.8));
    }

    #[test]
    fn test_invalid_definition_is_reported_once() {
        let definition = CsvImportDefinition::default().with_column(0, CsvField::Date);
        let result = extract_rows(&definition, "depot.csv", &rows(&["a", "b"]));
        assert!(result.items.is_empty());
        assert!(matches!(result.errors.as_slice(), [ExtractionError::Unreadable { .. }]));
    }
}

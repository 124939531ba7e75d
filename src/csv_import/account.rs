//! Account transaction rows.
//!
//! Deposits, removals, interest, dividends, fees and taxes become single
//! account transactions. Buy and sell rows become buy/sell entries, transfer
//! rows account transfers with an optional currency conversion.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::columns::{missing, Columns};
use super::definition::{CsvField, CsvImportDefinition};
use crate::error::{ConfigError, FieldError};
use crate::models::{new_uuid, AccountEntry, AccountTransferEntry, BuySellEntry, ExtractionResult, ItemKind};
use crate::pdf_import::with_security_items;
use crate::pp::{
    AccountTransaction, AccountTransactionType, ForexInfo, Money, PortfolioTransactionType, TransactionUnit,
};

pub struct AccountCsvExtractor<'d> {
    columns: Columns<'d>,
}

impl<'d> AccountCsvExtractor<'d> {
    pub fn new(definition: &'d CsvImportDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            columns: Columns::new(definition)?,
        })
    }

    pub fn extract(&self, source: &str, rows: &[Vec<String>]) -> ExtractionResult {
        let mut result = self.columns.extract_each(source, rows, |row| self.extract_row(row));
        result.items = with_security_items(result.items);
        result
    }

    fn extract_row(&self, row: &[String]) -> Result<ItemKind, FieldError> {
        let columns = &self.columns;

        let value = columns.decimal(row, CsvField::Value)?.ok_or_else(|| missing(CsvField::Value))?;
        let currency = columns.currency(row, CsvField::Currency);
        let amount = Money::from_decimal(value.abs(), &currency)?;
        let security = columns.security(row);
        let tx_type = self.transaction_type(row, value.is_sign_negative(), security.is_some())?;

        let date = columns.date(row)?;
        let note = columns.owned(row, CsvField::Note);

        match tx_type {
            AccountTransactionType::Buy | AccountTransactionType::Sell => {
                let security = columns.required_security(row)?;
                let shares = columns.shares(row)?.ok_or_else(|| missing(CsvField::Shares))?;
                let portfolio_type = if tx_type == AccountTransactionType::Buy {
                    PortfolioTransactionType::Buy
                } else {
                    PortfolioTransactionType::Sell
                };
                let mut entry = BuySellEntry::new(portfolio_type, date, amount, shares, security.clone());
                columns.add_units(row, &mut entry.portfolio_transaction, Some(&security))?;
                entry.portfolio_transaction.note = note.clone();
                entry.account_transaction.note = note;
                Ok(ItemKind::BuySell(entry))
            }
            AccountTransactionType::TransferIn | AccountTransactionType::TransferOut => {
                let mut entry = self.transfer(row, date, amount)?;
                entry.source.note = note.clone();
                entry.target.note = note;
                Ok(ItemKind::AccountTransfer(entry))
            }
            _ => {
                if tx_type == AccountTransactionType::Dividends && security.is_none() {
                    return Err(FieldError::Missing("security (isin, ticker, wkn or name)".to_string()));
                }

                let mut transaction = AccountTransaction::new(new_uuid(), date, tx_type, amount);
                transaction.note = note;
                if matches!(
                    tx_type,
                    AccountTransactionType::Dividends
                        | AccountTransactionType::Interest
                        | AccountTransactionType::InterestCharge
                ) {
                    transaction.shares = columns.shares(row)?.filter(|_| security.is_some());
                    columns.add_units(row, &mut transaction, security.as_ref())?;
                }
                Ok(ItemKind::AccountTransaction(AccountEntry { transaction, security }))
            }
        }
    }

    /// Without a type column, negative amounts are removals and positive
    /// ones dividends when a security is named, deposits otherwise
    fn transaction_type(
        &self,
        row: &[String],
        negative: bool,
        has_security: bool,
    ) -> Result<AccountTransactionType, FieldError> {
        let Some(name) = self.columns.type_name(row) else {
            return Ok(match (negative, has_security) {
                (true, _) => AccountTransactionType::Removal,
                (false, true) => AccountTransactionType::Dividends,
                (false, false) => AccountTransactionType::Deposit,
            });
        };
        AccountTransactionType::from_str(name)
            .ok_or_else(|| FieldError::malformed(CsvField::Type.as_str(), name, "unsupported transaction type"))
    }

    /// The value is debited from the source account. A gross amount in
    /// another currency is what the target account receives; the source leg
    /// then carries it as GROSS_VALUE forex.
    fn transfer(
        &self,
        row: &[String],
        date: NaiveDateTime,
        amount: Money,
    ) -> Result<AccountTransferEntry, FieldError> {
        let columns = &self.columns;
        let target_currency = columns.currency(row, CsvField::CurrencyGross);
        let gross = match (columns.decimal(row, CsvField::Gross)?, columns.text(row, CsvField::CurrencyGross)) {
            (Some(gross), Some(_)) if target_currency != amount.currency => Some(gross.abs()),
            _ => None,
        };
        let Some(gross) = gross else {
            return Ok(AccountTransferEntry::new(date, amount.clone(), amount));
        };

        let target_amount = Money::from_decimal(gross, &target_currency)?;
        let rate = match columns.decimal(row, CsvField::ExchangeRate)?.filter(|r| *r > Decimal::ZERO) {
            Some(rate) => rate,
            None => amount
                .to_decimal()
                .checked_div(gross)
                .filter(|r| *r > Decimal::ZERO)
                .map(|r| r.round_dp(10))
                .ok_or_else(|| FieldError::malformed(CsvField::Gross.as_str(), &gross.to_string(), "no exchange rate"))?,
        };

        let mut entry = AccountTransferEntry::new(date, amount.clone(), target_amount.clone());
        entry
            .source
            .units
            .push(TransactionUnit::gross_value(amount).with_forex(ForexInfo::new(target_amount, rate)));
        Ok(entry)
    }
}

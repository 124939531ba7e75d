//! Import actions, applied in this order by the standard pipeline.

mod currencies;
mod duplicates;
mod forex_gross_value;
mod security_values;
mod transaction_date;
mod valid_types;

pub use currencies::CheckCurrenciesAction;
pub use duplicates::DetectDuplicatesAction;
pub use forex_gross_value::CheckForexGrossValueAction;
pub use security_values::CheckSecurityRelatedValuesAction;
pub use transaction_date::CheckTransactionDateAction;
pub use valid_types::CheckValidTypesAction;

use super::types::{Severity, Status};

/// Fold several findings of one action into a single status
pub(crate) fn combine(action: &str, findings: Vec<Status>) -> Status {
    let worst = findings.iter().map(|s| s.severity).max().unwrap_or(Severity::Ok);
    if worst == Severity::Ok {
        return Status::ok(action);
    }
    let message = findings
        .iter()
        .filter(|s| s.severity == worst)
        .filter_map(|s| s.message.as_deref())
        .collect::<Vec<_>>()
        .join("; ");
    Status {
        severity: worst,
        action: action.to_string(),
        message: Some(message),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::config::ImportConfig;
    use crate::models::{AccountEntry, BuySellEntry, Item, ItemKind, SecurityDraft};
    use crate::pp::{
        AccountTransaction, AccountTransactionType, Client, Money, PortfolioTransactionType,
        TransactionUnit,
    };
    use crate::validation::ImportContext;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    pub fn context(client: &Client) -> ImportContext<'_> {
        ImportContext::new(client, ImportConfig::default(), today())
    }

    pub fn intel(currency: &str) -> SecurityDraft {
        SecurityDraft {
            name: Some("INTEL CORPORATION".into()),
            isin: Some("US4581401001".into()),
            ..SecurityDraft::new(currency)
        }
    }

    /// A plain EUR purchase of 100 shares
    pub fn buy(amount: i64, fees: &[i64]) -> Item {
        let mut entry = BuySellEntry::new(
            PortfolioTransactionType::Buy,
            date(2025, 6, 20),
            Money::new(amount, "EUR"),
            10_000_000_000,
            intel("EUR"),
        );
        for fee in fees {
            entry
                .portfolio_transaction
                .units
                .push(TransactionUnit::fee(Money::new(*fee, "EUR")));
        }
        Item::new(ItemKind::BuySell(entry), "Compra01.txt")
    }

    pub fn dividend(amount: Money) -> Item {
        let mut tx = AccountTransaction::new(
            "div".into(),
            date(2025, 6, 2),
            AccountTransactionType::Dividends,
            amount,
        );
        tx.shares = Some(10_000_000_000);
        Item::new(
            ItemKind::AccountTransaction(AccountEntry {
                transaction: tx,
                security: Some(intel("USD")),
            }),
            "Dividendos01.txt",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_keeps_worst() {
        let status = combine(
            "X",
            vec![
                Status::ok("X"),
                Status::warning("X", "a"),
                Status::warning("X", "b"),
            ],
        );
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(status.message.as_deref(), Some("a; b"));
        assert!(combine("X", vec![]).is_ok());
    }
}

use crate::models::{Item, ItemKind};
use crate::pp::{AccountTransactionType, PortfolioTransactionType};
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Checks that each leg carries a type its paired structure supports
pub struct CheckValidTypesAction;

const NAME: &str = "CheckValidTypes";

impl ImportAction for CheckValidTypesAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, _ctx: &ImportContext) -> Status {
        match &item.kind {
            ItemKind::Security(_) => Status::ok(NAME),
            ItemKind::BuySell(entry) => {
                let portfolio_type = entry.portfolio_transaction.transaction_type;
                if !matches!(
                    portfolio_type,
                    PortfolioTransactionType::Buy | PortfolioTransactionType::Sell
                ) {
                    return Status::error(
                        NAME,
                        format!("{} is not a buy/sell type", portfolio_type.as_str()),
                    );
                }
                let account_type = entry.account_transaction.transaction_type;
                if account_type != portfolio_type.account_type() {
                    return Status::error(
                        NAME,
                        format!(
                            "account leg {} does not match portfolio leg {}",
                            account_type.as_str(),
                            portfolio_type.as_str()
                        ),
                    );
                }
                Status::ok(NAME)
            }
            ItemKind::AccountTransaction(entry) => match entry.transaction.transaction_type {
                AccountTransactionType::Buy
                | AccountTransactionType::Sell
                | AccountTransactionType::TransferIn
                | AccountTransactionType::TransferOut => Status::error(
                    NAME,
                    format!(
                        "{} requires a paired transaction",
                        entry.transaction.transaction_type.as_str()
                    ),
                ),
                _ => Status::ok(NAME),
            },
            ItemKind::PortfolioTransaction(entry) => match entry.transaction.transaction_type {
                PortfolioTransactionType::DeliveryInbound
                | PortfolioTransactionType::DeliveryOutbound => Status::ok(NAME),
                other => Status::error(
                    NAME,
                    format!("{} requires a paired transaction", other.as_str()),
                ),
            },
            ItemKind::AccountTransfer(entry) => {
                if entry.source.transaction_type == AccountTransactionType::TransferOut
                    && entry.target.transaction_type == AccountTransactionType::TransferIn
                {
                    Status::ok(NAME)
                } else {
                    Status::error(NAME, "account transfer legs must be TRANSFER_OUT -> TRANSFER_IN")
                }
            }
            ItemKind::PortfolioTransfer(entry) => {
                if entry.source.transaction_type == PortfolioTransactionType::TransferOut
                    && entry.target.transaction_type == PortfolioTransactionType::TransferIn
                {
                    Status::ok(NAME)
                } else {
                    Status::error(NAME, "portfolio transfer legs must be TRANSFER_OUT -> TRANSFER_IN")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortfolioEntry;
    use crate::pp::{Client, Money, PortfolioTransaction};
    use crate::validation::actions::test_support::*;
    use crate::validation::Severity;

    #[test]
    fn test_buy_sell_polarity() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = buy(10000, &[]);
        assert!(CheckValidTypesAction.apply(&mut item, &ctx).is_ok());

        if let ItemKind::BuySell(e) = &mut item.kind {
            e.account_transaction.transaction_type = AccountTransactionType::Sell;
        }
        let status = CheckValidTypesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("does not match"));
    }

    #[test]
    fn test_unpaired_account_types() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = dividend(Money::new(357, "EUR"));
        assert!(CheckValidTypesAction.apply(&mut item, &ctx).is_ok());

        if let ItemKind::AccountTransaction(e) = &mut item.kind {
            e.transaction.transaction_type = AccountTransactionType::Buy;
        }
        assert_eq!(CheckValidTypesAction.apply(&mut item, &ctx).severity, Severity::Error);
    }

    #[test]
    fn test_portfolio_only_deliveries() {
        let client = Client::default();
        let ctx = context(&client);
        let tx = PortfolioTransaction::new(
            "p".into(),
            date(2025, 1, 2),
            PortfolioTransactionType::Buy,
            Money::new(100, "EUR"),
            1,
        );
        let mut item = Item::new(
            ItemKind::PortfolioTransaction(PortfolioEntry {
                transaction: tx,
                security: intel("EUR"),
            }),
            "csv",
        );
        assert_eq!(CheckValidTypesAction.apply(&mut item, &ctx).severity, Severity::Error);
    }
}

use crate::currency::is_known_currency;
use crate::models::{Item, ItemKind, LegKind};
use crate::pp::{Transaction, UnitType};
use crate::validation::actions::combine;
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Every amount must be in a known currency that its container can hold.
///
/// Units must share the transaction currency. A security traded in another
/// currency needs a GROSS_VALUE forex in that currency.
pub struct CheckCurrenciesAction;

const NAME: &str = "CheckCurrencies";

impl ImportAction for CheckCurrenciesAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status {
        if let ItemKind::Security(draft) = &item.kind {
            if !is_known_currency(&draft.currency) {
                return Status::error(NAME, format!("unknown currency {}", draft.currency));
            }
            return Status::ok(NAME);
        }

        let mut findings = Vec::new();

        for (_, tx) in item.legs() {
            check_leg_currencies(tx, &mut findings);
        }

        check_account_assignment(item, ctx, &mut findings);

        if let Some(security) = item.security() {
            if let Some((leg, tx)) = item.primary_leg() {
                check_security_currency(leg, tx, &security.currency, &mut findings);
            }
        }

        combine(NAME, findings)
    }
}

fn check_leg_currencies(tx: &dyn Transaction, findings: &mut Vec<Status>) {
    let currency = tx.currency();
    if !is_known_currency(currency) {
        findings.push(Status::error(NAME, format!("unknown currency {}", currency)));
        return;
    }

    for unit in tx.units() {
        if !is_known_currency(&unit.amount.currency) {
            findings.push(Status::error(
                NAME,
                format!("unknown currency {} in {} unit", unit.amount.currency, unit.unit_type.as_str()),
            ));
        } else if unit.amount.currency != currency {
            findings.push(Status::error(
                NAME,
                format!(
                    "{} unit in {} does not match transaction currency {}",
                    unit.unit_type.as_str(),
                    unit.amount.currency,
                    currency
                ),
            ));
        }

        if let Some(forex) = &unit.forex {
            if !is_known_currency(&forex.amount.currency) {
                findings.push(Status::error(
                    NAME,
                    format!("unknown forex currency {}", forex.amount.currency),
                ));
            }
        }
    }
}

fn check_account_assignment(item: &Item, ctx: &ImportContext, findings: &mut Vec<Status>) {
    let account_legs: Vec<&dyn Transaction> = item
        .legs()
        .into_iter()
        .filter(|(leg, _)| *leg == LegKind::Account)
        .map(|(_, tx)| tx)
        .collect();

    let assignments = [item.account.as_deref(), item.secondary_account.as_deref()];
    for (tx, assigned) in account_legs.iter().zip(assignments) {
        // Unit currencies of unassigned legs are checked by check_leg_currencies
        let Some(uuid) = assigned else { continue };
        match ctx.client.find_account(uuid) {
            Some(account) if account.currency != tx.currency() => findings.push(Status::error(
                NAME,
                format!(
                    "account {} holds {} but the transaction is in {}",
                    account.name,
                    account.currency,
                    tx.currency()
                ),
            )),
            Some(_) => {}
            None => findings.push(Status::error(NAME, format!("unknown account {}", uuid))),
        }
    }
}

fn check_security_currency(
    leg: LegKind,
    tx: &dyn Transaction,
    security_currency: &str,
    findings: &mut Vec<Status>,
) {
    if tx.currency() == security_currency {
        return;
    }

    let forex_currency = tx
        .unit(UnitType::GrossValue)
        .and_then(|u| u.forex.as_ref())
        .map(|f| f.amount.currency.as_str());

    match (leg, forex_currency) {
        (_, Some(currency)) if currency == security_currency => {}
        (_, Some(currency)) => findings.push(Status::error(
            NAME,
            format!(
                "gross value forex in {} but the security trades in {}",
                currency, security_currency
            ),
        )),
        // Account legs may omit the gross breakdown
        (LegKind::Account, None) => {}
        (LegKind::Portfolio, None) => findings.push(Status::error(
            NAME,
            format!(
                "transaction in {} for a security in {} without gross value forex",
                tx.currency(),
                security_currency
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountTransferEntry;
    use crate::pp::{Account, Client, ForexInfo, Money, TransactionUnit};
    use crate::validation::actions::test_support::*;
    use crate::validation::Severity;
    use rust_decimal_macros::dec;

    fn with_units(mut item: Item, units: Vec<TransactionUnit>) -> Item {
        if let ItemKind::BuySell(e) = &mut item.kind {
            e.portfolio_transaction.units.extend(units);
        }
        item
    }

    fn set_security_currency(item: &mut Item, currency: &str) {
        if let Some(s) = item.security_mut() {
            s.currency = currency.into();
        }
    }

    #[test]
    fn test_consistent_foreign_purchase() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = with_units(
            buy(185438, &[2000, 813]),
            vec![TransactionUnit::gross_value(Money::new(182625, "EUR"))
                .with_forex(ForexInfo::new(Money::new(209069, "USD"), dec!(0.8735)))],
        );
        set_security_currency(&mut item, "USD");
        assert!(CheckCurrenciesAction.apply(&mut item, &ctx).is_ok());
    }

    #[test]
    fn test_foreign_unit_without_forex_is_error() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = with_units(buy(10000, &[]), vec![TransactionUnit::fee(Money::new(100, "USD"))]);
        let status = CheckCurrenciesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("FEE unit in USD"));
    }

    #[test]
    fn test_missing_gross_forex_is_error() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = buy(10000, &[]);
        set_security_currency(&mut item, "USD");
        assert_eq!(CheckCurrenciesAction.apply(&mut item, &ctx).severity, Severity::Error);
    }

    #[test]
    fn test_dividend_without_gross_forex_is_ok() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = dividend(Money::new(357, "EUR"));
        assert!(CheckCurrenciesAction.apply(&mut item, &ctx).is_ok());
    }

    #[test]
    fn test_assigned_account_currency() {
        let mut client = Client::default();
        client.accounts.push(Account::new("chf".into(), "Konto CHF".into(), "CHF".into()));
        let ctx = context(&client);
        let mut item = buy(10000, &[]);
        item.assign_account(Some("chf".into()), None);
        let status = CheckCurrenciesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("holds CHF"));
    }

    #[test]
    fn test_unassigned_account_leg_with_mixed_units() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = dividend(Money::new(357, "EUR"));
        if let ItemKind::AccountTransaction(e) = &mut item.kind {
            e.transaction.units.push(TransactionUnit::tax(Money::new(244, "USD")));
        }
        assert!(item.account.is_none());

        let status = CheckCurrenciesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("TAX unit in USD"));
    }

    #[test]
    fn test_unassigned_transfer_legs_with_mixed_units() {
        let client = Client::default();
        let ctx = context(&client);
        let mut entry = AccountTransferEntry::new(date(2025, 3, 4), Money::new(10000, "CHF"), Money::new(10500, "EUR"));
        entry.target.units.push(TransactionUnit::fee(Money::new(50, "CHF")));
        let mut item = Item::new(ItemKind::AccountTransfer(entry), "Zahlung01.txt");

        let status = CheckCurrenciesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("FEE unit in CHF does not match transaction currency EUR"));
    }

    #[test]
    fn test_unknown_currency() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = dividend(Money::new(357, "XXX"));
        assert_eq!(CheckCurrenciesAction.apply(&mut item, &ctx).severity, Severity::Error);
    }
}

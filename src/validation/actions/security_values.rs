use crate::models::{Item, ItemKind, SecurityDraft};
use crate::pp::{
    AccountTransactionType, Client, ForexInfo, Money, Security, TransactionUnit, UnitType,
};
use crate::validation::actions::combine;
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Resolves the item's security against the ledger and checks share counts.
///
/// A resolved item is bound to the ledger security. When the ledger keeps the
/// security in another currency than the document stated, the gross value is
/// re-expressed in the ledger currency.
pub struct CheckSecurityRelatedValuesAction;

const NAME: &str = "CheckSecurityRelatedValues";

/// ISIN first, then WKN together with the name
pub fn resolve_security<'a>(draft: &SecurityDraft, client: &'a Client) -> Option<&'a Security> {
    if let Some(isin) = draft.isin.as_deref() {
        if let Some(security) = client.find_security_by_isin(isin) {
            return Some(security);
        }
    }
    match (draft.wkn.as_deref(), draft.name.as_deref()) {
        (Some(wkn), Some(name)) => client.find_security_by_wkn_and_name(wkn, name),
        _ => None,
    }
}

impl ImportAction for CheckSecurityRelatedValuesAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status {
        if let ItemKind::Security(draft) = &item.kind {
            if !draft.is_identified() {
                return Status::error(NAME, "security has neither ISIN, WKN, ticker nor name");
            }
            return match resolve_security(draft, ctx.client) {
                Some(existing) => Status::warning(
                    NAME,
                    format!("security already exists: {}", existing.name),
                ),
                None => Status::ok(NAME),
            };
        }

        let mut findings = vec![check_shares(item)];

        let Some(draft) = item.security().cloned() else {
            return combine(NAME, findings);
        };

        match resolve_security(&draft, ctx.client) {
            None if !draft.is_identified() => {
                findings.push(Status::error(NAME, "transaction without security"));
            }
            None => {
                log::debug!("{}: new security {:?}", item.source, draft.key());
            }
            Some(existing) => {
                item.bind_security(&existing.uuid);
                if existing.currency != draft.currency {
                    if let Some(security) = item.security_mut() {
                        security.currency = existing.currency.clone();
                    }
                    findings.push(reexpress_gross_value(item, &existing.currency, ctx));
                }
            }
        }

        combine(NAME, findings)
    }
}

fn check_shares(item: &Item) -> Status {
    match &item.kind {
        ItemKind::BuySell(_) | ItemKind::PortfolioTransaction(_) | ItemKind::PortfolioTransfer(_) => {
            if item.shares() <= 0 {
                return Status::error(NAME, "shares must be positive");
            }
        }
        ItemKind::AccountTransaction(entry) => {
            if entry.transaction.transaction_type == AccountTransactionType::Dividends
                && entry.transaction.shares.unwrap_or(0) < 0
            {
                return Status::error(NAME, "dividend with negative shares");
            }
        }
        _ => {}
    }
    Status::ok(NAME)
}

/// Rebuild the GROSS_VALUE forex of the primary leg in `security_currency`
fn reexpress_gross_value(item: &mut Item, security_currency: &str, ctx: &ImportContext) -> Status {
    let source = item.source.clone();
    let Some((_, tx)) = item.primary_leg_mut() else {
        return Status::ok(NAME);
    };

    let tx_currency = tx.currency().to_string();
    if tx_currency == security_currency {
        tx.remove_units(UnitType::GrossValue);
        return Status::ok(NAME);
    }

    let already_converted = tx
        .unit(UnitType::GrossValue)
        .and_then(|u| u.forex.as_ref())
        .map(|f| f.amount.currency == security_currency)
        .unwrap_or(false);
    if already_converted {
        return Status::ok(NAME);
    }

    let gross = match tx.gross_value() {
        Ok(gross) => gross,
        Err(e) => return Status::error(NAME, format!("cannot compute gross value: {}", e)),
    };

    let date = tx.date().date();
    let Some(rate) = ctx
        .exchange_rates
        .get_rate(security_currency, &tx_currency, date, ctx.base_currency())
    else {
        return Status::error(
            NAME,
            format!("no exchange rate {}/{} on {}", security_currency, tx_currency, date),
        );
    };

    let forex_amount = match gross
        .to_decimal()
        .checked_div(rate)
        .ok_or_else(|| crate::error::MoneyError::InvalidRate(rate.to_string()))
        .and_then(|value| Money::from_decimal(value, security_currency))
    {
        Ok(amount) => amount,
        Err(e) => return Status::error(NAME, e.to_string()),
    };

    log::info!(
        "{}: gross value {} re-expressed with forex {} at {}",
        source,
        gross,
        forex_amount,
        rate
    );
    tx.remove_units(UnitType::GrossValue);
    tx.add_unit(TransactionUnit::gross_value(gross).with_forex(ForexInfo::new(forex_amount, rate)));
    Status::ok(NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BuySellEntry;
    use crate::pp::PortfolioTransactionType;
    use crate::validation::actions::test_support::*;
    use crate::validation::Severity;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn ledger_with_intel(currency: &str) -> Client {
        let mut client = Client::new("EUR");
        client.securities.push(
            Security::new("intel-uuid".into(), "Intel".into(), currency.into()).with_isin("US4581401001"),
        );
        client
    }

    fn usd_purchase() -> Item {
        let entry = BuySellEntry::new(
            PortfolioTransactionType::Buy,
            date(2025, 6, 20),
            Money::new(210000, "USD"),
            10_000_000_000,
            intel("USD"),
        );
        Item::new(ItemKind::BuySell(entry), "Compra01.txt")
    }

    #[test]
    fn test_new_security_item() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = Item::new(ItemKind::Security(intel("USD")), "x");
        assert!(CheckSecurityRelatedValuesAction.apply(&mut item, &ctx).is_ok());

        let mut anonymous = Item::new(ItemKind::Security(SecurityDraft::new("USD")), "x");
        assert_eq!(
            CheckSecurityRelatedValuesAction.apply(&mut anonymous, &ctx).severity,
            Severity::Error
        );
    }

    #[test]
    fn test_existing_security_item_warns() {
        let client = ledger_with_intel("USD");
        let ctx = context(&client);
        let mut item = Item::new(ItemKind::Security(intel("USD")), "x");
        let status = CheckSecurityRelatedValuesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Warning);
        assert!(status.message.unwrap().contains("already exists"));
    }

    #[test]
    fn test_binds_resolved_security() {
        let client = ledger_with_intel("EUR");
        let ctx = context(&client);
        let mut item = buy(185438, &[2000, 813]);
        assert!(CheckSecurityRelatedValuesAction.apply(&mut item, &ctx).is_ok());
        assert_eq!(item.security().unwrap().uuid.as_deref(), Some("intel-uuid"));
        assert!(item.legs().iter().all(|(_, tx)| tx.security_uuid() == Some("intel-uuid")));
    }

    #[test]
    fn test_resolves_by_wkn_and_name() {
        let mut client = Client::new("EUR");
        client
            .securities
            .push(Security::new("tel".into(), "Deutsche Telekom AG".into(), "EUR".into()).with_wkn("555750"));
        let ctx = context(&client);
        let draft = SecurityDraft {
            name: Some("DEUTSCHE TELEKOM AG".into()),
            wkn: Some("555750".into()),
            ..SecurityDraft::new("EUR")
        };
        assert_eq!(resolve_security(&draft, ctx.client).map(|s| s.uuid.as_str()), Some("tel"));
    }

    #[test]
    fn test_non_positive_shares() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = buy(10000, &[]);
        if let ItemKind::BuySell(e) = &mut item.kind {
            e.portfolio_transaction.shares = 0;
        }
        let status = CheckSecurityRelatedValuesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.message.as_deref(), Some("shares must be positive"));
    }

    #[test]
    fn test_reexpress_in_ledger_currency() {
        let mut client = ledger_with_intel("EUR");
        client.exchange_rates.insert(
            "EUR",
            "USD",
            NaiveDate::from_ymd_opt(2025, 6, 19).unwrap(),
            dec!(1.1448),
        );
        let ctx = context(&client);
        let mut item = usd_purchase();

        assert!(CheckSecurityRelatedValuesAction.apply(&mut item, &ctx).is_ok());
        assert_eq!(item.security().unwrap().currency, "EUR");

        let (_, tx) = item.primary_leg().unwrap();
        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(210000, "USD"));
        let forex = gross.forex.as_ref().unwrap();
        assert_eq!(forex.amount, Money::new(183438, "EUR"));
        assert_eq!(forex.exchange_rate, dec!(1.1448));
        assert!(gross.is_forex_consistent(1));
    }

    #[test]
    fn test_reexpress_without_rate_fails() {
        let client = ledger_with_intel("EUR");
        let ctx = context(&client);
        let mut item = usd_purchase();
        let status = CheckSecurityRelatedValuesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.message.unwrap().contains("no exchange rate EUR/USD"));
    }

    #[test]
    fn test_forex_dropped_when_ledger_matches_transaction() {
        let client = ledger_with_intel("EUR");
        let ctx = context(&client);
        let mut item = buy(185438, &[]);
        if let ItemKind::BuySell(e) = &mut item.kind {
            e.security.currency = "USD".into();
            e.portfolio_transaction.units.push(
                TransactionUnit::gross_value(Money::new(185438, "EUR"))
                    .with_forex(ForexInfo::new(Money::new(212290, "USD"), dec!(0.8735))),
            );
        }
        assert!(CheckSecurityRelatedValuesAction.apply(&mut item, &ctx).is_ok());
        assert!(item.primary_leg().unwrap().1.unit(UnitType::GrossValue).is_none());
    }
}

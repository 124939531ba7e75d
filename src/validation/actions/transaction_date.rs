use chrono::{Datelike, Duration};

use crate::models::Item;
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Rejects dates before `min_year` or past today plus `max_future_days`
pub struct CheckTransactionDateAction;

const NAME: &str = "CheckTransactionDate";

impl ImportAction for CheckTransactionDateAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status {
        let Some(date) = item.date() else {
            return Status::ok(NAME);
        };
        let date = date.date();

        if date.year() < ctx.config.min_year {
            return Status::error(NAME, format!("date {} is before {}", date, ctx.config.min_year));
        }

        let latest = ctx.today + Duration::days(ctx.config.max_future_days);
        if date > latest {
            return Status::error(NAME, format!("date {} lies in the future", date));
        }

        Status::ok(NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::pp::Client;
    use crate::validation::actions::test_support::*;
    use crate::validation::Severity;

    fn item_on(y: i32, m: u32, d: u32) -> Item {
        let mut item = buy(10000, &[]);
        if let crate::models::ItemKind::BuySell(e) = &mut item.kind {
            e.portfolio_transaction.date = date(y, m, d);
            e.account_transaction.date = date(y, m, d);
        }
        item
    }

    #[test]
    fn test_plausible_date() {
        let client = Client::default();
        let ctx = context(&client);
        assert!(CheckTransactionDateAction.apply(&mut item_on(2025, 6, 20), &ctx).is_ok());
        assert!(CheckTransactionDateAction.apply(&mut item_on(2025, 7, 1), &ctx).is_ok());
    }

    #[test]
    fn test_future_and_ancient_dates() {
        let client = Client::default();
        let ctx = context(&client);
        let status = CheckTransactionDateAction.apply(&mut item_on(2025, 7, 2), &ctx);
        assert_eq!(status.severity, Severity::Error);

        let status = CheckTransactionDateAction.apply(&mut item_on(1899, 12, 31), &ctx);
        assert_eq!(status.severity, Severity::Error);
    }

    #[test]
    fn test_future_allowance() {
        let client = Client::default();
        let config = ImportConfig {
            max_future_days: 5,
            ..ImportConfig::default()
        };
        let ctx = ImportContext::new(&client, config, today());
        assert!(CheckTransactionDateAction.apply(&mut item_on(2025, 7, 6), &ctx).is_ok());
    }

    #[test]
    fn test_security_item_is_ok() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = Item::new(crate::models::ItemKind::Security(intel("USD")), "x");
        assert!(CheckTransactionDateAction.apply(&mut item, &ctx).is_ok());
    }
}

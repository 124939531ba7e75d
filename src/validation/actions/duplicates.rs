use crate::models::{Item, ItemKind};
use super::security_values::resolve_security;
use crate::validation::fingerprint::Fingerprint;
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Flags items whose primary leg matches an existing ledger transaction,
/// and security items for securities the ledger already holds.
///
/// Matches are never dropped, only surfaced as warnings.
pub struct DetectDuplicatesAction;

const NAME: &str = "DetectDuplicates";

impl ImportAction for DetectDuplicatesAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status {
        if let ItemKind::Security(draft) = &item.kind {
            return match resolve_security(draft, ctx.client) {
                Some(existing) => Status::warning(NAME, format!("security already in ledger: {}", existing.name)),
                None => Status::ok(NAME),
            };
        }

        let Some((leg, tx)) = item.primary_leg() else {
            return Status::ok(NAME);
        };
        let fingerprint = Fingerprint::of(leg, tx);

        let Some(sources) = ctx.fingerprints.lookup(&fingerprint) else {
            return Status::ok(NAME);
        };

        if sources.iter().any(|s| s.as_deref() == Some(item.source.as_str())) {
            return Status::warning(NAME, "same document already imported");
        }

        Status::warning(
            NAME,
            format!(
                "possible duplicate of {} {} {} on {}",
                leg.as_str(),
                fingerprint.type_str,
                tx.amount(),
                fingerprint.date
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pp::{Client, Money, Security};
    use crate::validation::actions::test_support::*;
    use crate::validation::{ImportContext, Severity};

    fn ledger_with(item: &Item) -> Client {
        let mut client = Client::default();
        client.insert(item);
        client
    }

    #[test]
    fn test_no_duplicate_in_empty_ledger() {
        let client = Client::default();
        let ctx = context(&client);
        assert!(DetectDuplicatesAction.apply(&mut buy(185438, &[]), &ctx).is_ok());
    }

    #[test]
    fn test_same_document_reimported() {
        let imported = buy(185438, &[]);
        let client = ledger_with(&imported);
        let ctx = context(&client);

        let status = DetectDuplicatesAction.apply(&mut buy(185438, &[]), &ctx);
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(status.message.as_deref(), Some("same document already imported"));
    }

    #[test]
    fn test_duplicate_from_other_source() {
        let imported = dividend(Money::new(357, "EUR"));
        let client = ledger_with(&imported);
        let ctx = ImportContext::new(&client, Default::default(), today());

        let mut again = dividend(Money::new(357, "EUR"));
        again.source = "other.csv".into();
        let status = DetectDuplicatesAction.apply(&mut again, &ctx);
        assert_eq!(status.severity, Severity::Warning);
        assert!(status.message.unwrap().starts_with("possible duplicate of account DIVIDENDS"));

        let mut different = dividend(Money::new(358, "EUR"));
        assert!(DetectDuplicatesAction.apply(&mut different, &ctx).is_ok());
    }

    #[test]
    fn test_new_security_item_is_ok() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = Item::new(ItemKind::Security(intel("USD")), "x");
        assert!(DetectDuplicatesAction.apply(&mut item, &ctx).is_ok());
    }

    #[test]
    fn test_known_security_item_warns() {
        let mut client = Client::default();
        client
            .securities
            .push(Security::new("intel-uuid".into(), "Intel".into(), "USD".into()).with_isin("US4581401001"));
        let ctx = context(&client);

        let mut item = Item::new(ItemKind::Security(intel("USD")), "x");
        let status = DetectDuplicatesAction.apply(&mut item, &ctx);
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(status.message.as_deref(), Some("security already in ledger: Intel"));
    }
}

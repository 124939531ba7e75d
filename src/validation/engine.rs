//! Validation Engine
//!
//! Runs the ordered import actions over candidate items and settles each
//! item's state and default acceptance.

use super::actions::*;
use super::types::*;
use crate::models::{Item, ItemState};

/// Items per worker below which validation stays on the calling thread
const MIN_CHUNK: usize = 64;

/// Ordered list of import actions
pub struct ImportPipeline {
    actions: Vec<Box<dyn ImportAction>>,
}

impl ImportPipeline {
    pub fn new(actions: Vec<Box<dyn ImportAction>>) -> Self {
        Self { actions }
    }

    /// Date, types, security, duplicates, currencies, forex
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CheckTransactionDateAction),
            Box::new(CheckValidTypesAction),
            Box::new(CheckSecurityRelatedValuesAction),
            Box::new(DetectDuplicatesAction),
            Box::new(CheckCurrenciesAction),
            Box::new(CheckForexGrossValueAction),
        ])
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Attach a status from every action, then settle state and acceptance
    pub fn check(&self, item: &mut Item, ctx: &ImportContext) {
        for action in &self.actions {
            let status = action.apply(item, ctx);
            if !status.is_ok() {
                log::debug!(
                    "{} [{}]: {} {}",
                    item.source,
                    item.type_str(),
                    status.severity.as_str(),
                    status.message.as_deref().unwrap_or_default()
                );
            }
            item.add_status(status);
        }
        item.state = ItemState::Checked;
        item.accepted = item.max_severity() < Severity::Error;
    }

    /// Validate all items. Large batches are split across scoped threads;
    /// the context is shared read-only.
    pub fn run(&self, items: &mut [Item], ctx: &ImportContext) {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        if !ctx.config.parallel || workers < 2 || items.len() < MIN_CHUNK * 2 {
            for item in items.iter_mut() {
                self.check(item, ctx);
            }
        } else {
            let chunk_size = items.len().div_ceil(workers).max(MIN_CHUNK);
            std::thread::scope(|scope| {
                for chunk in items.chunks_mut(chunk_size) {
                    scope.spawn(move || {
                        for item in chunk.iter_mut() {
                            self.check(item, ctx);
                        }
                    });
                }
            });
        }

        let errors = items
            .iter()
            .filter(|i| i.max_severity() == Severity::Error)
            .count();
        let warnings = items
            .iter()
            .filter(|i| i.max_severity() == Severity::Warning)
            .count();
        log::info!(
            "Validated {} items: {} with warnings, {} with errors",
            items.len(),
            warnings,
            errors
        );
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::models::{BuySellEntry, ItemKind};
    use crate::pdf_import::{bbva, extract_documents, Document, Registry};
    use crate::pp::{Client, ForexInfo, Money, PortfolioTransactionType, Security, TransactionUnit, UnitType};
    use crate::validation::actions::test_support::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_order() {
        assert_eq!(
            ImportPipeline::standard().action_names(),
            vec![
                "CheckTransactionDate",
                "CheckValidTypes",
                "CheckSecurityRelatedValues",
                "DetectDuplicates",
                "CheckCurrencies",
                "CheckForexGrossValue",
            ]
        );
    }

    #[test]
    fn test_clean_item_is_accepted() {
        let client = Client::default();
        let ctx = context(&client);
        let mut items = vec![buy(185438, &[2000, 813])];
        ImportPipeline::standard().run(&mut items, &ctx);

        assert_eq!(items[0].statuses.len(), 6);
        assert_eq!(items[0].state, ItemState::Checked);
        assert_eq!(items[0].max_severity(), Severity::Ok);
        assert!(items[0].accepted);
    }

    #[test]
    fn test_currency_gate_rejects() {
        let client = Client::default();
        let ctx = context(&client);
        let mut item = buy(10000, &[]);
        if let ItemKind::BuySell(e) = &mut item.kind {
            e.portfolio_transaction.units.push(TransactionUnit::tax(Money::new(100, "USD")));
        }
        ImportPipeline::standard().check(&mut item, &ctx);
        assert_eq!(item.max_severity(), Severity::Error);
        assert!(!item.accepted);
    }

    #[test]
    fn test_usd_purchase_of_eur_security() {
        let mut client = Client::new("EUR");
        client.securities.push(
            Security::new("intel".into(), "Intel".into(), "EUR".into()).with_isin("US4581401001"),
        );
        client.exchange_rates.insert(
            "EUR",
            "USD",
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            dec!(1.1448),
        );
        let ctx = context(&client);

        let entry = BuySellEntry::new(
            PortfolioTransactionType::Buy,
            date(2025, 6, 20),
            Money::new(210000, "USD"),
            10_000_000_000,
            intel("USD"),
        );
        let mut item = Item::new(ItemKind::BuySell(entry), "Compra01.txt");
        ImportPipeline::standard().check(&mut item, &ctx);

        assert_eq!(item.max_severity(), Severity::Ok, "{:?}", item.statuses);
        let (_, tx) = item.primary_leg().unwrap();
        let forex = tx.unit(UnitType::GrossValue).unwrap().forex.clone().unwrap();
        assert_eq!(forex, ForexInfo::new(Money::new(183438, "EUR"), dec!(1.1448)));
    }

    #[test]
    fn test_reimporting_an_inserted_document() {
        let registry = Registry::standard();
        let documents = vec![Document::new("Compra01.txt", bbva::tests::COMPRA01)];
        let mut client = Client::new("EUR");

        let mut first = extract_documents(&documents, &registry, &ImportConfig::default()).items;
        {
            let ctx = context(&client);
            ImportPipeline::standard().run(&mut first, &ctx);
        }
        assert!(first.iter().all(|i| i.accepted), "{:?}", first);
        for item in &first {
            client.insert(item);
        }
        assert_eq!(client.securities.len(), 1);

        let mut second = extract_documents(&documents, &registry, &ImportConfig::default()).items;
        let ctx = context(&client);
        ImportPipeline::standard().run(&mut second, &ctx);

        let messages: Vec<&str> = second
            .iter()
            .flat_map(|i| i.statuses.iter())
            .filter_map(|s| s.message.as_deref())
            .collect();
        assert!(messages.iter().any(|m| m.starts_with("security already exists")), "{:?}", messages);
        assert!(messages.contains(&"same document already imported"), "{:?}", messages);
        assert!(second.iter().all(|i| i.max_severity() == Severity::Warning));
        assert!(second.iter().all(|i| i.accepted));
        for item in &second {
            let duplicates = item.statuses.iter().find(|s| s.action == "DetectDuplicates").unwrap();
            assert_eq!(duplicates.severity, Severity::Warning, "{} {:?}", item.type_str(), item.statuses);
        }
    }

    #[test]
    fn test_parallel_run_checks_every_item() {
        let client = Client::default();
        let ctx = ImportContext::new(&client, ImportConfig::default(), today());
        let mut items: Vec<Item> = (0..300).map(|i| buy(10000 + i, &[])).collect();
        ImportPipeline::standard().run(&mut items, &ctx);
        assert!(items.iter().all(|i| i.state == ItemState::Checked && i.statuses.len() == 6));
    }
}

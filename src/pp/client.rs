//! Client model - the read-only ledger snapshot consulted during import.

use serde::{Deserialize, Serialize};

use super::account::Account;
use super::portfolio::Portfolio;
use super::security::Security;
use crate::currency::ExchangeRateTable;

/// Current ledger format version
pub const CURRENT_VERSION: i32 = 68;

/// The root client object: securities, accounts and portfolios of a ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// File format version
    #[serde(default = "default_version")]
    pub version: i32,
    /// Base currency (default: EUR)
    pub base_currency: String,
    #[serde(default)]
    pub securities: Vec<Security>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    /// Historical exchange rates known to the ledger
    #[serde(default)]
    pub exchange_rates: ExchangeRateTable,
}

fn default_version() -> i32 {
    CURRENT_VERSION
}

impl Client {
    pub fn new(base_currency: impl Into<String>) -> Self {
        Self {
            version: CURRENT_VERSION,
            base_currency: base_currency.into(),
            securities: Vec::new(),
            accounts: Vec::new(),
            portfolios: Vec::new(),
            exchange_rates: ExchangeRateTable::new(),
        }
    }

    /// Find a security by UUID
    pub fn find_security(&self, uuid: &str) -> Option<&Security> {
        self.securities.iter().find(|s| s.uuid == uuid)
    }

    /// Find a security by ISIN
    pub fn find_security_by_isin(&self, isin: &str) -> Option<&Security> {
        self.securities.iter().find(|s| s.isin.as_deref() == Some(isin))
    }

    /// Find a security by WKN and name
    pub fn find_security_by_wkn_and_name(&self, wkn: &str, name: &str) -> Option<&Security> {
        self.securities.iter().find(|s| s.matches_wkn_and_name(wkn, name))
    }

    /// Find an account by UUID
    pub fn find_account(&self, uuid: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.uuid == uuid)
    }

    /// Find a portfolio by UUID
    pub fn find_portfolio(&self, uuid: &str) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.uuid == uuid)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new("EUR")
    }
}

#[cfg(test)]
impl Client {
    /// Apply an accepted item the way the insert collaborator would.
    ///
    /// Transactions land in the assigned account/portfolio, or in the first
    /// one of matching currency (created on demand).
    pub fn insert(&mut self, item: &crate::models::Item) {
        use crate::models::ItemKind;

        if let ItemKind::Security(draft) = &item.kind {
            let exists = draft
                .isin
                .as_deref()
                .map(|isin| self.find_security_by_isin(isin).is_some())
                .unwrap_or(false);
            if !exists {
                let mut security = Security::new(
                    uuid::Uuid::new_v4().to_string(),
                    draft.name.clone().unwrap_or_default(),
                    draft.currency.clone(),
                );
                security.isin = draft.isin.clone();
                security.wkn = draft.wkn.clone();
                security.ticker = draft.ticker.clone();
                self.securities.push(security);
            }
            return;
        }

        let security_uuid = item.security().and_then(|draft| {
            draft.uuid.clone().or_else(|| {
                draft
                    .isin
                    .as_deref()
                    .and_then(|isin| self.find_security_by_isin(isin))
                    .map(|s| s.uuid.clone())
            })
        });

        match &item.kind {
            ItemKind::Security(_) => {}
            ItemKind::BuySell(e) => {
                let mut ptx = e.portfolio_transaction.clone();
                let mut atx = e.account_transaction.clone();
                ptx.security_uuid = security_uuid.clone();
                atx.security_uuid = security_uuid;
                self.portfolio_for(item.portfolio.as_deref()).transactions.push(ptx);
                self.account_for(item.account.as_deref(), &atx.amount.currency)
                    .transactions
                    .push(atx);
            }
            ItemKind::AccountTransaction(e) => {
                let mut tx = e.transaction.clone();
                tx.security_uuid = security_uuid;
                self.account_for(item.account.as_deref(), &tx.amount.currency)
                    .transactions
                    .push(tx);
            }
            ItemKind::PortfolioTransaction(e) => {
                let mut tx = e.transaction.clone();
                tx.security_uuid = security_uuid;
                self.portfolio_for(item.portfolio.as_deref()).transactions.push(tx);
            }
            ItemKind::AccountTransfer(e) => {
                self.account_for(item.account.as_deref(), &e.source.amount.currency)
                    .transactions
                    .push(e.source.clone());
                self.account_for(item.secondary_account.as_deref(), &e.target.amount.currency)
                    .transactions
                    .push(e.target.clone());
            }
            ItemKind::PortfolioTransfer(e) => {
                let mut source = e.source.clone();
                let mut target = e.target.clone();
                source.security_uuid = security_uuid.clone();
                target.security_uuid = security_uuid;
                self.portfolio_for(item.portfolio.as_deref()).transactions.push(source);
                self.portfolio_for(item.secondary_portfolio.as_deref())
                    .transactions
                    .push(target);
            }
        }
    }

    fn account_for(&mut self, uuid: Option<&str>, currency: &str) -> &mut Account {
        let position = match uuid {
            Some(uuid) => self.accounts.iter().position(|a| a.uuid == uuid),
            None => self.accounts.iter().position(|a| a.currency == currency),
        };
        match position {
            Some(index) => &mut self.accounts[index],
            None => {
                let account = Account::new(
                    uuid.map(str::to_string).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    format!("Cash {}", currency),
                    currency.to_string(),
                );
                self.accounts.push(account);
                let last = self.accounts.len() - 1;
                &mut self.accounts[last]
            }
        }
    }

    fn portfolio_for(&mut self, uuid: Option<&str>) -> &mut Portfolio {
        let position = match uuid {
            Some(uuid) => self.portfolios.iter().position(|p| p.uuid == uuid),
            None => (!self.portfolios.is_empty()).then_some(0),
        };
        match position {
            Some(index) => &mut self.portfolios[index],
            None => {
                let portfolio = Portfolio::new(
                    uuid.map(str::to_string).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    "Depot".to_string(),
                );
                self.portfolios.push(portfolio);
                let last = self.portfolios.len() - 1;
                &mut self.portfolios[last]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new("USD");
        assert_eq!(client.version, CURRENT_VERSION);
        assert_eq!(client.base_currency, "USD");
        assert!(client.exchange_rates.is_empty());
    }

    #[test]
    fn test_find_security() {
        let mut client = Client::default();
        client.securities.push(
            Security::new("sec-1".to_string(), "Apple".to_string(), "USD".to_string())
                .with_isin("US0378331005")
                .with_wkn("865985"),
        );

        assert!(client.find_security("sec-1").is_some());
        assert!(client.find_security("unknown").is_none());
        assert!(client.find_security_by_isin("US0378331005").is_some());
        assert!(client.find_security_by_wkn_and_name("865985", "apple").is_some());
    }

    #[test]
    fn test_deserialize_minimal_ledger() {
        let client: Client = serde_json::from_str(r#"{"baseCurrency":"CHF"}"#).unwrap();
        assert_eq!(client.base_currency, "CHF");
        assert_eq!(client.version, CURRENT_VERSION);
        assert!(client.accounts.is_empty());
    }
}

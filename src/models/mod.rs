//! Candidate transaction model.
//!
//! Grammars and CSV templates emit [`Item`]s. The validation pipeline attaches
//! statuses and the review layer decides which items reach the ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::pp::transaction::Transaction;
use crate::pp::{
    AccountTransaction, AccountTransactionType, CrossEntry, Money, PortfolioTransaction,
    PortfolioTransactionType,
};
use crate::validation::{Severity, Status};

pub(crate) fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Security as described by a document, before resolution against the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDraft {
    /// Ledger security this draft resolved to
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub isin: Option<String>,
    pub wkn: Option<String>,
    pub ticker: Option<String>,
    /// Trading currency
    pub currency: String,
}

impl SecurityDraft {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Identity used to emit each new security once per batch
    pub fn key(&self) -> Option<String> {
        if let Some(isin) = &self.isin {
            return Some(format!("isin:{}", isin));
        }
        match (&self.wkn, &self.name) {
            (Some(wkn), Some(name)) => Some(format!("wkn:{}:{}", wkn, name.to_lowercase())),
            (Some(wkn), None) => Some(format!("wkn:{}", wkn)),
            (None, Some(name)) => Some(format!("name:{}", name.to_lowercase())),
            (None, None) => self.ticker.as_ref().map(|t| format!("ticker:{}", t)),
        }
    }

    pub fn is_identified(&self) -> bool {
        self.key().is_some()
    }
}

/// Purchase or sale: portfolio leg and account leg referencing each other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuySellEntry {
    pub portfolio_transaction: PortfolioTransaction,
    pub account_transaction: AccountTransaction,
    pub security: SecurityDraft,
}

impl BuySellEntry {
    /// Build both legs. Units live on the portfolio leg.
    pub fn new(
        tx_type: PortfolioTransactionType,
        date: NaiveDateTime,
        amount: Money,
        shares: i64,
        security: SecurityDraft,
    ) -> Self {
        let mut portfolio_transaction =
            PortfolioTransaction::new(new_uuid(), date, tx_type, amount.clone(), shares);
        let mut account_transaction =
            AccountTransaction::new(new_uuid(), date, tx_type.account_type(), amount);
        account_transaction.shares = Some(shares);

        let cross = CrossEntry::buy_sell(portfolio_transaction.uuid.clone(), account_transaction.uuid.clone());
        portfolio_transaction.cross_entry = Some(cross.clone());
        account_transaction.cross_entry = Some(cross);

        Self {
            portfolio_transaction,
            account_transaction,
            security,
        }
    }
}

/// Single account transaction (dividend, fee, interest, tax, deposit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    pub transaction: AccountTransaction,
    pub security: Option<SecurityDraft>,
}

/// Single portfolio transaction (inbound/outbound delivery)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub transaction: PortfolioTransaction,
    pub security: SecurityDraft,
}

/// Cash moved between two accounts, possibly across currencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransferEntry {
    pub source: AccountTransaction,
    pub target: AccountTransaction,
}

impl AccountTransferEntry {
    pub fn new(date: NaiveDateTime, source_amount: Money, target_amount: Money) -> Self {
        let mut source =
            AccountTransaction::new(new_uuid(), date, AccountTransactionType::TransferOut, source_amount);
        let mut target =
            AccountTransaction::new(new_uuid(), date, AccountTransactionType::TransferIn, target_amount);
        let cross = CrossEntry::account_transfer(source.uuid.clone(), target.uuid.clone());
        source.cross_entry = Some(cross.clone());
        target.cross_entry = Some(cross);
        Self { source, target }
    }
}

/// Shares moved between two portfolios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTransferEntry {
    pub source: PortfolioTransaction,
    pub target: PortfolioTransaction,
    pub security: SecurityDraft,
}

impl PortfolioTransferEntry {
    pub fn new(date: NaiveDateTime, amount: Money, shares: i64, security: SecurityDraft) -> Self {
        let mut source = PortfolioTransaction::new(
            new_uuid(),
            date,
            PortfolioTransactionType::TransferOut,
            amount.clone(),
            shares,
        );
        let mut target = PortfolioTransaction::new(
            new_uuid(),
            date,
            PortfolioTransactionType::TransferIn,
            amount,
            shares,
        );
        let cross = CrossEntry::portfolio_transfer(source.uuid.clone(), target.uuid.clone());
        source.cross_entry = Some(cross.clone());
        target.cross_entry = Some(cross);
        Self {
            source,
            target,
            security,
        }
    }
}

/// What an item holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    Security(SecurityDraft),
    BuySell(BuySellEntry),
    AccountTransaction(AccountEntry),
    PortfolioTransaction(PortfolioEntry),
    AccountTransfer(AccountTransferEntry),
    PortfolioTransfer(PortfolioTransferEntry),
}

/// Which ledger container a transaction leg belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegKind {
    Account,
    Portfolio,
}

impl LegKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Portfolio => "portfolio",
        }
    }
}

/// Lifecycle of a candidate item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemState {
    Extracted,
    Checked,
    Accepted,
    Rejected,
}

/// Candidate extraction outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub kind: ItemKind,
    /// Name of the originating document
    pub source: String,
    /// Set when extraction of this item partially failed
    pub failure: Option<String>,
    pub statuses: Vec<Status>,
    pub state: ItemState,
    pub accepted: bool,
    pub account: Option<String>,
    pub portfolio: Option<String>,
    pub secondary_account: Option<String>,
    pub secondary_portfolio: Option<String>,
}

impl Item {
    pub fn new(kind: ItemKind, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut item = Self {
            kind,
            source: source.clone(),
            failure: None,
            statuses: Vec::new(),
            state: ItemState::Extracted,
            accepted: true,
            account: None,
            portfolio: None,
            secondary_account: None,
            secondary_portfolio: None,
        };
        for (_, tx) in item.legs_mut() {
            tx.set_source(&source);
        }
        item
    }

    /// Type discriminator shown to the review layer
    pub fn type_str(&self) -> &'static str {
        match &self.kind {
            ItemKind::Security(_) => "SECURITY",
            ItemKind::BuySell(e) => e.portfolio_transaction.transaction_type.as_str(),
            ItemKind::AccountTransaction(e) => e.transaction.transaction_type.as_str(),
            ItemKind::PortfolioTransaction(e) => e.transaction.transaction_type.as_str(),
            ItemKind::AccountTransfer(_) => "ACCOUNT_TRANSFER",
            ItemKind::PortfolioTransfer(_) => "PORTFOLIO_TRANSFER",
        }
    }

    pub fn is_security(&self) -> bool {
        matches!(self.kind, ItemKind::Security(_))
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.primary_leg().map(|(_, tx)| tx.date())
    }

    pub fn amount(&self) -> Option<&Money> {
        self.primary_leg().map(|(_, tx)| tx.amount())
    }

    pub fn shares(&self) -> i64 {
        match &self.kind {
            ItemKind::Security(_) | ItemKind::AccountTransfer(_) => 0,
            ItemKind::BuySell(e) => e.portfolio_transaction.shares,
            ItemKind::AccountTransaction(e) => e.transaction.shares.unwrap_or(0),
            ItemKind::PortfolioTransaction(e) => e.transaction.shares,
            ItemKind::PortfolioTransfer(e) => e.source.shares,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Security(_) => None,
            ItemKind::BuySell(e) => e.portfolio_transaction.note.as_deref(),
            ItemKind::AccountTransaction(e) => e.transaction.note.as_deref(),
            ItemKind::PortfolioTransaction(e) => e.transaction.note.as_deref(),
            ItemKind::AccountTransfer(e) => e.source.note.as_deref(),
            ItemKind::PortfolioTransfer(e) => e.source.note.as_deref(),
        }
    }

    /// The security this item refers to, if any
    pub fn security(&self) -> Option<&SecurityDraft> {
        match &self.kind {
            ItemKind::Security(s) => Some(s),
            ItemKind::BuySell(e) => Some(&e.security),
            ItemKind::AccountTransaction(e) => e.security.as_ref(),
            ItemKind::PortfolioTransaction(e) => Some(&e.security),
            ItemKind::AccountTransfer(_) => None,
            ItemKind::PortfolioTransfer(e) => Some(&e.security),
        }
    }

    pub fn security_mut(&mut self) -> Option<&mut SecurityDraft> {
        match &mut self.kind {
            ItemKind::Security(s) => Some(s),
            ItemKind::BuySell(e) => Some(&mut e.security),
            ItemKind::AccountTransaction(e) => e.security.as_mut(),
            ItemKind::PortfolioTransaction(e) => Some(&mut e.security),
            ItemKind::AccountTransfer(_) => None,
            ItemKind::PortfolioTransfer(e) => Some(&mut e.security),
        }
    }

    /// Bind every leg to a ledger security
    pub fn bind_security(&mut self, uuid: &str) {
        if let Some(security) = self.security_mut() {
            security.uuid = Some(uuid.to_string());
        }
        for (_, tx) in self.legs_mut() {
            tx.set_security_uuid(Some(uuid.to_string()));
        }
    }

    /// All transaction legs with the container they belong to
    pub fn legs(&self) -> Vec<(LegKind, &dyn Transaction)> {
        match &self.kind {
            ItemKind::Security(_) => vec![],
            ItemKind::BuySell(e) => vec![
                (LegKind::Portfolio, &e.portfolio_transaction as &dyn Transaction),
                (LegKind::Account, &e.account_transaction as &dyn Transaction),
            ],
            ItemKind::AccountTransaction(e) => vec![(LegKind::Account, &e.transaction as &dyn Transaction)],
            ItemKind::PortfolioTransaction(e) => {
                vec![(LegKind::Portfolio, &e.transaction as &dyn Transaction)]
            }
            ItemKind::AccountTransfer(e) => vec![
                (LegKind::Account, &e.source as &dyn Transaction),
                (LegKind::Account, &e.target as &dyn Transaction),
            ],
            ItemKind::PortfolioTransfer(e) => vec![
                (LegKind::Portfolio, &e.source as &dyn Transaction),
                (LegKind::Portfolio, &e.target as &dyn Transaction),
            ],
        }
    }

    pub fn legs_mut(&mut self) -> Vec<(LegKind, &mut dyn Transaction)> {
        match &mut self.kind {
            ItemKind::Security(_) => vec![],
            ItemKind::BuySell(e) => vec![
                (LegKind::Portfolio, &mut e.portfolio_transaction as &mut dyn Transaction),
                (LegKind::Account, &mut e.account_transaction as &mut dyn Transaction),
            ],
            ItemKind::AccountTransaction(e) => {
                vec![(LegKind::Account, &mut e.transaction as &mut dyn Transaction)]
            }
            ItemKind::PortfolioTransaction(e) => {
                vec![(LegKind::Portfolio, &mut e.transaction as &mut dyn Transaction)]
            }
            ItemKind::AccountTransfer(e) => vec![
                (LegKind::Account, &mut e.source as &mut dyn Transaction),
                (LegKind::Account, &mut e.target as &mut dyn Transaction),
            ],
            ItemKind::PortfolioTransfer(e) => vec![
                (LegKind::Portfolio, &mut e.source as &mut dyn Transaction),
                (LegKind::Portfolio, &mut e.target as &mut dyn Transaction),
            ],
        }
    }

    /// The leg carrying units and used for duplicate detection
    pub fn primary_leg(&self) -> Option<(LegKind, &dyn Transaction)> {
        self.legs().into_iter().next()
    }

    pub fn primary_leg_mut(&mut self) -> Option<(LegKind, &mut dyn Transaction)> {
        self.legs_mut().into_iter().next()
    }

    pub fn add_status(&mut self, status: Status) {
        self.statuses.push(status);
    }

    /// Highest severity among attached statuses
    pub fn max_severity(&self) -> Severity {
        self.statuses
            .iter()
            .map(|s| s.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }

    /// Toggle set by the review layer
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
        if self.state != ItemState::Extracted {
            self.state = if accepted {
                ItemState::Accepted
            } else {
                ItemState::Rejected
            };
        }
    }

    pub fn assign_account(&mut self, primary: Option<String>, secondary: Option<String>) {
        self.account = primary;
        self.secondary_account = secondary;
    }

    pub fn assign_portfolio(&mut self, primary: Option<String>, secondary: Option<String>) {
        self.portfolio = primary;
        self.secondary_portfolio = secondary;
    }
}

/// Outcome of extracting a batch of documents
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub items: Vec<Item>,
    pub errors: Vec<ExtractionError>,
    /// Documents no grammar claimed, left for manual classification
    pub unclassified: Vec<String>,
}

impl ExtractionResult {
    pub fn merge(&mut self, other: ExtractionResult) {
        self.items.extend(other.items);
        self.errors.extend(other.errors);
        self.unclassified.extend(other.unclassified);
    }

    pub fn transaction_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| !i.is_security())
    }
}

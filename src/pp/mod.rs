//! Portfolio Performance data models.
//!
//! Money, units and transactions shared by extraction and validation, plus
//! the read-only ledger snapshot (`Client`) items are checked against.

pub mod account;
pub mod client;
pub mod common;
pub mod portfolio;
pub mod security;
pub mod transaction;

// Re-export main types for convenience
pub use account::Account;
pub use client::{Client, CURRENT_VERSION};
pub use common::{shares, ForexInfo, Money, SHARES_FACTOR};
pub use portfolio::Portfolio;
pub use security::Security;
pub use transaction::{
    AccountTransaction, AccountTransactionType, CrossEntry, CrossEntryType,
    PortfolioTransaction, PortfolioTransactionType, Transaction, TransactionUnit, UnitType,
};

//! Account model for Portfolio Performance.
//!
//! Accounts represent cash/deposit accounts that hold money (not securities).

use serde::{Deserialize, Serialize};

use super::transaction::AccountTransaction;

/// A cash/deposit account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uuid: String,
    pub name: String,
    pub currency: String,
    /// Whether the account is retired/inactive
    #[serde(default)]
    pub is_retired: bool,
    /// Account transactions
    #[serde(default)]
    pub transactions: Vec<AccountTransaction>,
}

impl Account {
    pub fn new(uuid: String, name: String, currency: String) -> Self {
        Self {
            uuid,
            name,
            currency,
            is_retired: false,
            transactions: Vec::new(),
        }
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            String::new(),
            "EUR".to_string(),
        )
    }
}

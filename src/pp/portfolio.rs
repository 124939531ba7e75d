//! Portfolio model for Portfolio Performance.
//!
//! Portfolios (Depots) hold securities and track buy/sell transactions.

use serde::{Deserialize, Serialize};

use super::transaction::PortfolioTransaction;

/// A securities portfolio (Depot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub uuid: String,
    pub name: String,
    /// Reference to the linked cash account (for settlements)
    pub reference_account_uuid: Option<String>,
    /// Whether the portfolio is retired/inactive
    #[serde(default)]
    pub is_retired: bool,
    /// Portfolio transactions
    #[serde(default)]
    pub transactions: Vec<PortfolioTransaction>,
}

impl Portfolio {
    pub fn new(uuid: String, name: String) -> Self {
        Self {
            uuid,
            name,
            reference_account_uuid: None,
            is_retired: false,
            transactions: Vec::new(),
        }
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), String::new())
    }
}

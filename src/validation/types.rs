//! Import Validation Types
//!
//! Status records attached to candidate items and the read-only context the
//! import actions consult.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fingerprint::FingerprintIndex;
use crate::config::ImportConfig;
use crate::currency::ExchangeRateTable;
use crate::models::Item;
use crate::pp::Client;

/// Severity of a status, ordered `Ok < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Self::Ok),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Result of one import action applied to one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub severity: Severity,
    /// Name of the action that produced this status
    pub action: String,
    pub message: Option<String>,
}

impl Status {
    pub fn ok(action: &str) -> Self {
        Self {
            severity: Severity::Ok,
            action: action.to_string(),
            message: None,
        }
    }

    pub fn warning(action: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            action: action.to_string(),
            message: Some(message.into()),
        }
    }

    pub fn error(action: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            action: action.to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }
}

/// Everything an action may look at besides the item itself.
///
/// Built once per batch and never mutated while items are checked.
pub struct ImportContext<'a> {
    pub client: &'a Client,
    pub fingerprints: FingerprintIndex,
    pub exchange_rates: &'a ExchangeRateTable,
    pub config: ImportConfig,
    pub today: NaiveDate,
}

impl<'a> ImportContext<'a> {
    pub fn new(client: &'a Client, config: ImportConfig, today: NaiveDate) -> Self {
        Self {
            client,
            fingerprints: FingerprintIndex::build(client),
            exchange_rates: &client.exchange_rates,
            config,
            today,
        }
    }

    /// Pivot currency for rate triangulation
    pub fn base_currency(&self) -> &str {
        if self.client.base_currency.is_empty() {
            &self.config.base_currency
        } else {
            &self.client.base_currency
        }
    }
}

/// One step of the validation pipeline.
///
/// Actions may normalize the item (e.g. bind it to a ledger security) before
/// later actions see it.
pub trait ImportAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Ok);
        assert_eq!(Severity::from_str("WARNING"), Some(Severity::Warning));
        assert_eq!(Severity::Error.as_str(), "ERROR");
    }

    #[test]
    fn test_status_serialization() {
        let status = Status::warning("DetectDuplicates", "possible duplicate");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["action"], "DetectDuplicates");
        assert!(Status::ok("x").is_ok());
    }

    #[test]
    fn test_context_base_currency() {
        let client = Client::new("CHF");
        let ctx = ImportContext::new(&client, ImportConfig::default(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(ctx.base_currency(), "CHF");
        assert!(ctx.fingerprints.is_empty());
    }
}

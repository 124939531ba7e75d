//! Security model for Portfolio Performance.

use serde::{Deserialize, Serialize};

/// A security (stock, ETF, fund, etc.) as held in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub uuid: String,
    pub name: String,
    /// Trading currency
    pub currency: String,
    /// ISIN (International Securities Identification Number)
    pub isin: Option<String>,
    /// WKN (German security identification)
    pub wkn: Option<String>,
    /// Ticker symbol
    pub ticker: Option<String>,
    /// Whether the security is retired/inactive
    #[serde(default)]
    pub is_retired: bool,
}

impl Security {
    pub fn new(uuid: String, name: String, currency: String) -> Self {
        Self {
            uuid,
            name,
            currency,
            isin: None,
            wkn: None,
            ticker: None,
            is_retired: false,
        }
    }

    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = Some(isin.into());
        self
    }

    pub fn with_wkn(mut self, wkn: impl Into<String>) -> Self {
        self.wkn = Some(wkn.into());
        self
    }

    /// Same WKN and same name (case-insensitive)
    pub fn matches_wkn_and_name(&self, wkn: &str, name: &str) -> bool {
        self.wkn.as_deref() == Some(wkn) && self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

impl Default for Security {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            String::new(),
            "EUR".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_creation() {
        let sec = Security::new("test-uuid".to_string(), "Apple Inc.".to_string(), "USD".to_string())
            .with_isin("US0378331005");
        assert_eq!(sec.uuid, "test-uuid");
        assert_eq!(sec.currency, "USD");
        assert_eq!(sec.isin.as_deref(), Some("US0378331005"));
        assert!(!sec.is_retired);
    }

    #[test]
    fn test_wkn_and_name_match() {
        let sec = Security::new("s".into(), "Deutsche Telekom AG".into(), "EUR".into()).with_wkn("555750");
        assert!(sec.matches_wkn_and_name("555750", "DEUTSCHE TELEKOM AG "));
        assert!(!sec.matches_wkn_and_name("555750", "Telekom"));
        assert!(!sec.matches_wkn_and_name("555751", "Deutsche Telekom AG"));
    }
}

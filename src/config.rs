//! Import configuration.
//!
//! Loaded from a camelCase JSON file; every field has a default so partial
//! files are accepted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::currency::is_known_currency;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Forex drift is an ERROR instead of a WARNING
    pub strict_forex: bool,
    /// Days past today a transaction date may lie
    pub max_future_days: i64,
    /// Earliest plausible transaction year
    pub min_year: i32,
    /// Forex tolerance in minor units
    pub forex_tolerance: i64,
    /// Extract the documents of a batch on worker threads
    pub parallel: bool,
    /// Pivot currency for rate triangulation when the ledger has none
    pub base_currency: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            strict_forex: false,
            max_future_days: 0,
            min_year: 1900,
            forex_tolerance: 1,
            parallel: true,
            base_currency: "EUR".to_string(),
        }
    }
}

impl ImportConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No import config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config in {}", path.display()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.forex_tolerance < 0 {
            return Err(ConfigError::Invalid {
                field: "forexTolerance",
                reason: "must not be negative".to_string(),
            });
        }
        if self.max_future_days < 0 {
            return Err(ConfigError::Invalid {
                field: "maxFutureDays",
                reason: "must not be negative".to_string(),
            });
        }
        if !is_known_currency(&self.base_currency) {
            return Err(ConfigError::Invalid {
                field: "baseCurrency",
                reason: format!("unknown currency {}", self.base_currency),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert!(!config.strict_forex);
        assert_eq!(config.forex_tolerance, 1);
        assert_eq!(config.min_year, 1900);
        assert!(config.parallel);
    }

    #[test]
    fn test_partial_json() {
        let config = ImportConfig::from_json_str(r#"{"strictForex": true, "baseCurrency": "CHF"}"#).unwrap();
        assert!(config.strict_forex);
        assert_eq!(config.base_currency, "CHF");
        assert_eq!(config.max_future_days, 0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ImportConfig::from_json_str(r#"{"forexTolerance": -1}"#),
            Err(ConfigError::Invalid { field: "forexTolerance", .. })
        ));
        assert!(matches!(
            ImportConfig::from_json_str(r#"{"baseCurrency": "XYZ"}"#),
            Err(ConfigError::Invalid { field: "baseCurrency", .. })
        ));
        assert!(matches!(ImportConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let config = ImportConfig::load(Path::new("/nonexistent/import.json")).unwrap();
        assert_eq!(config, ImportConfig::default());
    }
}

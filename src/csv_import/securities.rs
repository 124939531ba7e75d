//! Security master data rows.

use std::collections::HashSet;

use super::columns::Columns;
use super::definition::CsvImportDefinition;
use crate::error::ConfigError;
use crate::models::{ExtractionResult, ItemKind};

/// One security per row, identified by any of ISIN, WKN, ticker or name.
/// Rows naming a security already seen in the file are dropped.
pub struct SecurityCsvExtractor<'d> {
    columns: Columns<'d>,
}

impl<'d> SecurityCsvExtractor<'d> {
    pub fn new(definition: &'d CsvImportDefinition) -> Result<Self, ConfigError> {
        Ok(Self {
            columns: Columns::new(definition)?,
        })
    }

    pub fn extract(&self, source: &str, rows: &[Vec<String>]) -> ExtractionResult {
        let mut result = self.columns.extract_each(source, rows, |row| {
            self.columns.required_security(row).map(ItemKind::Security)
        });

        let mut seen = HashSet::new();
        result.items.retain(|item| match item.security().and_then(|s| s.key()) {
            Some(key) => {
                let first = seen.insert(key.clone());
                if !first {
                    log::debug!("CSV Import: {} repeats security {}", source, key);
                }
                first
            }
            None => true,
        });
        result
    }
}

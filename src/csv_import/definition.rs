//! Column mapping of a CSV import.
//!
//! A definition tells the extractor which column holds which field and how
//! the column's values are formatted, and whether the rows are portfolio
//! transactions, account transactions or securities. Definitions come from
//! broker templates or from a JSON file written by the importer configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::pdf_import::NumberFormat;
use crate::pp::{AccountTransactionType, PortfolioTransactionType};

/// What one row of the file describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CsvTarget {
    #[default]
    PortfolioTransactions,
    AccountTransactions,
    Securities,
}

impl CsvTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortfolioTransactions => "portfolioTransactions",
            Self::AccountTransactions => "accountTransactions",
            Self::Securities => "securities",
        }
    }

    fn required_fields(&self) -> &'static [CsvField] {
        match self {
            Self::PortfolioTransactions => &[CsvField::Date, CsvField::Value, CsvField::Shares],
            Self::AccountTransactions => &[CsvField::Date, CsvField::Value],
            Self::Securities => &[],
        }
    }

    /// Type names a type column may map to
    pub fn knows_type(&self, name: &str) -> bool {
        match self {
            Self::PortfolioTransactions => PortfolioTransactionType::from_str(name).is_some(),
            Self::AccountTransactions => AccountTransactionType::from_str(name).is_some(),
            Self::Securities => false,
        }
    }
}

/// Target field of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CsvField {
    Date,
    Time,
    Isin,
    Wkn,
    Ticker,
    Name,
    Value,
    Currency,
    Fees,
    Taxes,
    Gross,
    CurrencyGross,
    ExchangeRate,
    Shares,
    Type,
    Note,
}

impl CsvField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Isin => "isin",
            Self::Wkn => "wkn",
            Self::Ticker => "ticker",
            Self::Name => "name",
            Self::Value => "value",
            Self::Currency => "currency",
            Self::Fees => "fees",
            Self::Taxes => "taxes",
            Self::Gross => "gross",
            Self::CurrencyGross => "currencyGross",
            Self::ExchangeRate => "exchangeRate",
            Self::Shares => "shares",
            Self::Type => "type",
            Self::Note => "note",
        }
    }

    /// Fields read as numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Value | Self::Fees | Self::Taxes | Self::Gross | Self::ExchangeRate | Self::Shares
        )
    }
}

/// Label of the type column mapped to a transaction type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLabel {
    /// Regex searched in the cell, case-insensitive
    pub pattern: String,
    /// Transaction type name of the definition's target, e.g. `BUY` or `DIVIDENDS`
    pub transaction_type: String,
}

/// Per-column value format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnFormat {
    Number { format: NumberFormat },
    /// chrono format string
    Date { pattern: String },
    TypeMap { labels: Vec<TypeLabel> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub index: usize,
    pub field: CsvField,
    #[serde(default)]
    pub format: Option<ColumnFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvImportDefinition {
    pub target: CsvTarget,
    pub delimiter: char,
    pub has_header: bool,
    pub columns: Vec<ColumnMapping>,
    /// Used by numeric columns without their own format
    pub number_format: NumberFormat,
    /// Tried in order by date columns without their own pattern
    pub date_formats: Vec<String>,
    /// Currency of rows without a currency column or with an unknown code
    pub default_currency: String,
}

impl Default for CsvImportDefinition {
    fn default() -> Self {
        Self {
            target: CsvTarget::default(),
            delimiter: ';',
            has_header: true,
            columns: Vec::new(),
            number_format: NumberFormat::German,
            date_formats: vec!["%Y-%m-%d".to_string(), "%d.%m.%Y".to_string()],
            default_currency: "EUR".to_string(),
        }
    }
}

impl CsvImportDefinition {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let definition: CsvImportDefinition = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn column(&self, field: CsvField) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn for_target(target: CsvTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn with_column(mut self, index: usize, field: CsvField) -> Self {
        self.columns.push(ColumnMapping {
            index,
            field,
            format: None,
        });
        self
    }

    pub fn with_formatted_column(mut self, index: usize, field: CsvField, format: ColumnFormat) -> Self {
        self.columns.push(ColumnMapping {
            index,
            field,
            format: Some(format),
        });
        self
    }

    /// Required fields of the target are mapped, no field is mapped twice
    /// and every column format fits its field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for required in self.target.required_fields() {
            if self.column(*required).is_none() {
                return Err(ConfigError::Invalid {
                    field: "columns",
                    reason: format!("no column mapped to '{}'", required.as_str()),
                });
            }
        }

        if self.target == CsvTarget::Securities
            && ![CsvField::Isin, CsvField::Wkn, CsvField::Ticker, CsvField::Name]
                .iter()
                .any(|f| self.column(*f).is_some())
        {
            return Err(ConfigError::Invalid {
                field: "columns",
                reason: "securities need an isin, wkn, ticker or name column".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.field) {
                return Err(ConfigError::Invalid {
                    field: "columns",
                    reason: format!("'{}' is mapped twice", column.field.as_str()),
                });
            }
            let fits = match &column.format {
                None => true,
                Some(ColumnFormat::Number { .. }) => column.field.is_numeric(),
                Some(ColumnFormat::Date { .. }) => column.field == CsvField::Date,
                Some(ColumnFormat::TypeMap { .. }) => column.field == CsvField::Type,
            };
            if !fits {
                return Err(ConfigError::Invalid {
                    field: "columns",
                    reason: format!("format does not apply to '{}'", column.field.as_str()),
                });
            }
            if let Some(ColumnFormat::TypeMap { labels }) = &column.format {
                if let Some(label) = labels.iter().find(|l| !self.target.knows_type(&l.transaction_type)) {
                    return Err(ConfigError::Invalid {
                        field: "typeMap",
                        reason: format!(
                            "'{}' is not a type of {}",
                            label.transaction_type,
                            self.target.as_str()
                        ),
                    });
                }
            }
        }

        if self.default_currency.len() != 3 {
            return Err(ConfigError::Invalid {
                field: "defaultCurrency",
                reason: format!("'{}' is not a currency code", self.default_currency),
            });
        }
        Ok(())
    }
}

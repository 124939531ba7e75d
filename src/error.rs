//! Error types for the import pipeline.

use serde::Serialize;
use thiserror::Error;

/// Errors of money arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("invalid exchange rate {0}")]
    InvalidRate(String),

    #[error("amount overflow")]
    Overflow,
}

/// Outcome of a single field extraction step that did not yield a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing value for '{0}'")]
    Missing(String),

    #[error("no line matched section '{0}'")]
    Unmatched(String),

    #[error("malformed value '{value}' for '{field}': {reason}")]
    Malformed {
        field: String,
        value: String,
        reason: String,
    },
}

impl FieldError {
    pub fn malformed(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<MoneyError> for FieldError {
    fn from(err: MoneyError) -> Self {
        Self::Malformed {
            field: "money".to_string(),
            value: String::new(),
            reason: err.to_string(),
        }
    }
}

/// Faults in a grammar definition, reported when the registry is built
#[derive(Debug, Clone, Error)]
pub enum GrammarError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("duplicate section id '{0}'")]
    DuplicateSectionId(String),

    #[error("section '{0}' has no patterns")]
    EmptySection(String),

    #[error("grammar '{grammar}': {source}")]
    Grammar {
        grammar: String,
        #[source]
        source: Box<GrammarError>,
    },
}

/// Errors recorded while extracting a document.
///
/// These never abort a batch: they are collected next to the extracted items.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExtractionError {
    #[error("{document}: block at lines {start}-{end} failed: {reason}")]
    #[serde(rename_all = "camelCase")]
    Block {
        document: String,
        start: usize,
        end: usize,
        reason: String,
        raw_text: String,
    },

    #[error("{document}: no transaction found")]
    NoTransactionFound { document: String },

    #[error("{document}: unreadable document: {reason}")]
    Unreadable { document: String, reason: String },

    #[error("{document}: row {row}: {reason}")]
    Row {
        document: String,
        row: usize,
        reason: String,
    },
}

impl ExtractionError {
    pub fn document(&self) -> &str {
        match self {
            Self::Block { document, .. }
            | Self::NoTransactionFound { document }
            | Self::Unreadable { document, .. }
            | Self::Row { document, .. } => document,
        }
    }
}

/// Errors loading the import configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let err = FieldError::malformed("amount", "1,2,3", "not a number");
        assert_eq!(err.to_string(), "malformed value '1,2,3' for 'amount': not a number");
        assert_eq!(FieldError::Missing("date".into()).to_string(), "missing value for 'date'");
    }

    #[test]
    fn test_extraction_error_document() {
        let err = ExtractionError::Block {
            document: "Kauf01.txt".into(),
            start: 3,
            end: 9,
            reason: "missing value for 'date'".into(),
            raw_text: "...".into(),
        };
        assert_eq!(err.document(), "Kauf01.txt");
        assert!(err.to_string().contains("lines 3-9"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "block");
        assert_eq!(json["rawText"], "...");
    }
}

//! Broker templates for CSV import.
//!
//! Contains predefined column mappings for the transaction exports of
//! German and international brokers.

use serde::{Deserialize, Serialize};

use super::definition::{ColumnFormat, CsvField, CsvImportDefinition, TypeLabel};
use crate::pdf_import::NumberFormat;
use crate::pp::PortfolioTransactionType;

use CsvField::*;
use PortfolioTransactionType::{Buy, DeliveryInbound, DeliveryOutbound, Sell, TransferIn, TransferOut};

/// Share of detection headers a file must contain before its template is used
pub const MIN_CONFIDENCE: f32 = 0.75;

/// A broker template with detection patterns and column mapping.
#[derive(Debug, Clone)]
pub struct BrokerTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Headers that must be present for detection (case-insensitive)
    pub detection_headers: &'static [&'static str],
    pub delimiter: char,
    pub date_format: &'static str,
    pub number_format: NumberFormat,
    pub columns: &'static [(usize, CsvField)],
    /// Maps broker-specific labels (prefix, case-insensitive) to transaction types
    pub type_mapping: &'static [(&'static str, PortfolioTransactionType)],
}

impl BrokerTemplate {
    pub fn definition(&self) -> CsvImportDefinition {
        let mut definition = CsvImportDefinition {
            delimiter: self.delimiter,
            has_header: true,
            number_format: self.number_format,
            ..Default::default()
        };

        for &(index, field) in self.columns {
            definition = match field {
                Date => definition.with_formatted_column(
                    index,
                    field,
                    ColumnFormat::Date {
                        pattern: self.date_format.to_string(),
                    },
                ),
                Type if !self.type_mapping.is_empty() => {
                    let labels = self
                        .type_mapping
                        .iter()
                        .map(|(label, transaction_type)| TypeLabel {
                            pattern: format!("^{}", regex::escape(label)),
                            transaction_type: transaction_type.as_str().to_string(),
                        })
                        .collect();
                    definition.with_formatted_column(index, field, ColumnFormat::TypeMap { labels })
                }
                _ => definition.with_column(index, field),
            };
        }
        definition
    }
}

/// Result of broker detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDetectionResult {
    pub template_id: Option<String>,
    pub broker_name: String,
    pub confidence: f32,
    pub detected_headers: Vec<String>,
}

/// Summary of a broker template for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerTemplateSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

// ============================================================================
// Broker Templates
// ============================================================================

/// Trade Republic CSV template
const TRADE_REPUBLIC: BrokerTemplate = BrokerTemplate {
    id: "trade-republic",
    name: "Trade Republic",
    description: "Trade Republic Transaktionsexport",
    detection_headers: &["Datum", "Typ", "ISIN", "Stück", "Preis je Aktie"],
    delimiter: ';',
    date_format: "%d.%m.%Y",
    number_format: NumberFormat::German,
    columns: &[(0, Date), (1, Type), (2, Isin), (3, Shares), (5, Value), (6, Currency)],
    type_mapping: &[("Kauf", Buy), ("Sparplan", Buy), ("Verkauf", Sell)],
};

/// Scalable Capital CSV template
const SCALABLE_CAPITAL: BrokerTemplate = BrokerTemplate {
    id: "scalable-capital",
    name: "Scalable Capital",
    description: "Scalable Capital / Baader Bank Export",
    detection_headers: &["Buchungsdatum", "Typ", "Wertpapier", "ISIN", "Anzahl", "Kurs"],
    delimiter: ';',
    date_format: "%d.%m.%Y",
    number_format: NumberFormat::German,
    columns: &[
        (0, Date),
        (1, Type),
        (2, Name),
        (3, Isin),
        (4, Shares),
        (6, Value),
        (7, Currency),
        (8, Fees),
    ],
    type_mapping: &[
        ("Kauf", Buy),
        ("Sparplan", Buy),
        ("Verkauf", Sell),
        ("Einbuchung", DeliveryInbound),
        ("Ausbuchung", DeliveryOutbound),
    ],
};

/// ING-DiBa CSV template
const ING_DIBA: BrokerTemplate = BrokerTemplate {
    id: "ing-diba",
    name: "ING-DiBa",
    description: "ING-DiBa Depotauszug",
    detection_headers: &["Buchung", "Wertpapier", "ISIN", "Stück", "Kurs"],
    delimiter: ';',
    date_format: "%d.%m.%Y",
    number_format: NumberFormat::German,
    // No type column: the sign of the amount decides
    columns: &[(0, Date), (1, Name), (2, Isin), (3, Shares), (5, Value), (6, Currency)],
    type_mapping: &[],
};

/// DEGIRO CSV template
const DEGIRO: BrokerTemplate = BrokerTemplate {
    id: "degiro",
    name: "DEGIRO",
    description: "DEGIRO Transaktionsübersicht",
    detection_headers: &["Datum", "Produkt", "ISIN", "Anzahl", "Kurs"],
    delimiter: ',',
    date_format: "%d-%m-%Y",
    number_format: NumberFormat::German,
    columns: &[
        (0, Date),
        (1, Time),
        (2, Name),
        (3, Isin),
        (5, Shares),
        (7, Value),
        (8, Currency),
        (10, Fees),
    ],
    type_mapping: &[],
};

/// Comdirect CSV template
const COMDIRECT: BrokerTemplate = BrokerTemplate {
    id: "comdirect",
    name: "Comdirect",
    description: "Comdirect Depotauszug",
    detection_headers: &["Buchungstag", "Geschäftsart", "WKN", "ISIN", "Stück"],
    delimiter: ';',
    date_format: "%d.%m.%Y",
    number_format: NumberFormat::German,
    columns: &[
        (0, Date),
        (1, Type),
        (2, Wkn),
        (3, Isin),
        (4, Shares),
        (6, Value),
        (7, Currency),
    ],
    type_mapping: &[
        ("Kauf", Buy),
        ("Verkauf", Sell),
        ("Depotübertrag Eingang", TransferIn),
        ("Depotübertrag Ausgang", TransferOut),
    ],
};

/// Consorsbank CSV template
const CONSORSBANK: BrokerTemplate = BrokerTemplate {
    id: "consorsbank",
    name: "Consorsbank",
    description: "Consorsbank Export",
    detection_headers: &["Datum", "Umsatzart", "ISIN", "Stück", "Kurs"],
    delimiter: ';',
    date_format: "%d.%m.%Y",
    number_format: NumberFormat::German,
    columns: &[(0, Date), (1, Type), (2, Isin), (3, Shares), (5, Value), (6, Currency)],
    type_mapping: &[("Kauf", Buy), ("Bezug", Buy), ("Verkauf", Sell)],
};

/// Interactive Brokers CSV template
const INTERACTIVE_BROKERS: BrokerTemplate = BrokerTemplate {
    id: "interactive-brokers",
    name: "Interactive Brokers",
    description: "IBKR Activity Statement",
    detection_headers: &["Symbol", "Date/Time", "Quantity", "T. Price", "Proceeds"],
    delimiter: ',',
    date_format: "%Y-%m-%d",
    number_format: NumberFormat::English,
    // Proceeds are negative for purchases
    columns: &[(0, Ticker), (1, Date), (2, Shares), (4, Value), (5, Currency), (6, Fees)],
    type_mapping: &[],
};

// ============================================================================
// Template Registry
// ============================================================================

/// Get all available broker templates
pub fn get_all_templates() -> Vec<&'static BrokerTemplate> {
    vec![
        &TRADE_REPUBLIC,
        &SCALABLE_CAPITAL,
        &ING_DIBA,
        &DEGIRO,
        &COMDIRECT,
        &CONSORSBANK,
        &INTERACTIVE_BROKERS,
    ]
}

/// Get a specific template by ID
pub fn get_template(id: &str) -> Option<&'static BrokerTemplate> {
    get_all_templates().into_iter().find(|t| t.id == id)
}

pub fn template_summaries() -> Vec<BrokerTemplateSummary> {
    get_all_templates()
        .into_iter()
        .map(|t| BrokerTemplateSummary {
            id: t.id.to_string(),
            name: t.name.to_string(),
            description: Some(t.description.to_string()),
        })
        .collect()
}

/// Detect broker from CSV headers
pub fn detect_broker(headers: &[String]) -> BrokerDetectionResult {
    let headers_lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

    let mut best_match: Option<(&BrokerTemplate, f32)> = None;

    for template in get_all_templates() {
        let matched_count = template
            .detection_headers
            .iter()
            .filter(|dh| headers_lower.iter().any(|h| h.contains(&dh.to_lowercase())))
            .count();

        let confidence = matched_count as f32 / template.detection_headers.len() as f32;

        if confidence > 0.0 && best_match.map_or(true, |(_, best)| confidence > best) {
            best_match = Some((template, confidence));
        }
    }

    match best_match {
        Some((template, confidence)) => BrokerDetectionResult {
            template_id: Some(template.id.to_string()),
            broker_name: template.name.to_string(),
            confidence,
            detected_headers: headers.to_vec(),
        },
        None => BrokerDetectionResult {
            template_id: None,
            broker_name: "Unbekannt".to_string(),
            confidence: 0.0,
            detected_headers: headers.to_vec(),
        },
    }
}

/// Import definition of the template detected from the header row
pub fn definition_for_headers(headers: &[String]) -> Option<CsvImportDefinition> {
    let detection = detect_broker(headers);
    if detection.confidence < MIN_CONFIDENCE {
        log::debug!(
            "CSV Import: best template {} below confidence ({:.2})",
            detection.broker_name,
            detection.confidence
        );
        return None;
    }
    let template = get_template(detection.template_id.as_deref()?)?;
    log::info!("CSV Import: using template {}", template.name);
    Some(template.definition())
}

//! CSV Import module with broker template support.
//!
//! Rows arrive already tokenized. A [`CsvImportDefinition`] maps columns to
//! fields and names what the rows describe: portfolio transactions, account
//! transactions or securities. Broker templates provide definitions for
//! known export formats.

mod account;
mod columns;
pub mod definition;
pub mod extractor;
mod securities;
mod templates;

pub use account::AccountCsvExtractor;
pub use definition::{ColumnFormat, ColumnMapping, CsvField, CsvImportDefinition, CsvTarget, TypeLabel};
pub use extractor::{extract_rows, CsvExtractor};
pub use securities::SecurityCsvExtractor;
pub use templates::{
    definition_for_headers, detect_broker, get_all_templates, get_template, template_summaries, BrokerDetectionResult,
    BrokerTemplate, BrokerTemplateSummary, MIN_CONFIDENCE,
};

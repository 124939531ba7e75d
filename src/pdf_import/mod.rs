//! PDF Bank Statement Import Module
//!
//! Extracts candidate transactions from the text of bank documents. Every
//! institution contributes a declarative grammar; the assistant picks the
//! grammar for each document.

pub mod assistant;
pub mod bbva;
pub mod consorsbank;
pub mod dkb;
pub mod document;
pub mod extractor_utils;
pub mod parser;
pub mod postfinance;
pub mod swissquote;

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

pub use assistant::Dispatch;
pub use document::Document;
pub use extractor_utils::NumberFormat;
pub use parser::{Block, BlockContext, DocumentType, Draft, DraftKind, ParsedData, Recipe, Section};

use crate::config::ImportConfig;
use crate::error::{ExtractionError, GrammarError};
use crate::models::{ExtractionResult, Item, ItemKind};

/// Institution grammar
pub trait BankGrammar: Send + Sync {
    /// Name shown to the user
    fn label(&self) -> &'static str;

    /// PDF author field written by the institution's document generator
    fn author(&self) -> Option<&'static str> {
        None
    }

    /// Text fragments that identify the institution
    fn bank_identifiers(&self) -> &[&'static str];

    fn number_format(&self) -> NumberFormat;

    /// chrono formats tried in order
    fn date_formats(&self) -> &'static [&'static str];

    fn document_types(&self) -> Vec<DocumentType>;
}

/// A grammar whose document types were built and validated
pub struct Grammar {
    pub key: &'static str,
    pub label: &'static str,
    pub author: Option<&'static str>,
    pub bank_identifiers: Vec<&'static str>,
    number_format: NumberFormat,
    date_formats: &'static [&'static str],
    document_types: Vec<DocumentType>,
}

impl Grammar {
    pub fn compile(key: &'static str, source: &dyn BankGrammar) -> Result<Self, GrammarError> {
        let document_types = source.document_types();
        for document_type in &document_types {
            document_type.validate().map_err(|e| GrammarError::Grammar {
                grammar: key.to_string(),
                source: Box::new(e),
            })?;
        }

        Ok(Self {
            key,
            label: source.label(),
            author: source.author(),
            bank_identifiers: source.bank_identifiers().to_vec(),
            number_format: source.number_format(),
            date_formats: source.date_formats(),
            document_types,
        })
    }

    /// Run every document type that applies to the document.
    ///
    /// A document no document type applies to, or one that yields neither
    /// items nor errors, is reported as `NoTransactionFound`.
    pub fn extract(&self, document: &Document) -> ExtractionResult {
        let lines = document.lines();
        let mut result = ExtractionResult::default();

        for document_type in self.document_types.iter().filter(|t| t.matches(&lines)) {
            let (items, errors) = document_type.parse(&document.name, &lines, self.number_format, self.date_formats);
            result.items.extend(items);
            result.errors.extend(errors);
        }

        if result.items.is_empty() && result.errors.is_empty() {
            result.errors.push(ExtractionError::NoTransactionFound {
                document: document.name.clone(),
            });
        }
        result
    }
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("document_types", &self.document_types.len())
            .finish()
    }
}

/// The grammars shipped with the crate, in dispatch order
pub fn standard_grammars() -> Vec<(&'static str, Box<dyn BankGrammar>)> {
    vec![
        ("bbva", Box::new(bbva::BbvaGrammar::new())),
        ("consorsbank", Box::new(consorsbank::ConsorsbankGrammar::new())),
        ("dkb", Box::new(dkb::DkbGrammar::new())),
        ("postfinance", Box::new(postfinance::PostfinanceGrammar::new())),
        ("swissquote", Box::new(swissquote::SwissquoteGrammar::new())),
    ]
}

/// Compiled grammars keyed by institution
pub struct Registry {
    grammars: Vec<Grammar>,
    errors: Vec<GrammarError>,
}

impl Registry {
    /// Compile all grammars. Faulty grammars are logged and left out.
    pub fn new(sources: Vec<(&'static str, Box<dyn BankGrammar>)>) -> Self {
        let mut grammars = Vec::with_capacity(sources.len());
        let mut errors = Vec::new();

        for (key, source) in sources {
            match Grammar::compile(key, source.as_ref()) {
                Ok(grammar) => grammars.push(grammar),
                Err(e) => {
                    log::error!("Grammar {} skipped: {}", key, e);
                    errors.push(e);
                }
            }
        }

        log::debug!("Registry built with {} grammars", grammars.len());
        Self { grammars, errors }
    }

    pub fn standard() -> Self {
        Self::new(standard_grammars())
    }

    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    pub fn get(&self, key: &str) -> Option<&Grammar> {
        self.grammars.iter().find(|g| g.key == key)
    }

    /// Construction faults of skipped grammars
    pub fn errors(&self) -> &[GrammarError] {
        &self.errors
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

static STANDARD: Lazy<Registry> = Lazy::new(Registry::standard);

/// Process-wide standard registry, compiled on first use
pub fn shared() -> &'static Registry {
    &STANDARD
}

/// Extract one document: readability check, dispatch, grammar run
pub fn extract_document(document: &Document, registry: &Registry) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    if let Err(e) = document.check_readable() {
        log::warn!("{}", e);
        result.errors.push(e);
        return result;
    }

    match assistant::find_matching_grammar(document, registry) {
        Dispatch::Matched(grammar) => {
            log::debug!("{}: using grammar {}", document.name, grammar.label);
            result = grammar.extract(document);
            log::info!(
                "{}: {} items, {} errors ({})",
                document.name,
                result.items.len(),
                result.errors.len(),
                grammar.label
            );
        }
        Dispatch::Deferred { isin } => {
            log::warn!("{}: mentions institution security {}, left for manual classification", document.name, isin);
            result.unclassified.push(document.name.clone());
        }
        Dispatch::Unmatched => {
            log::warn!("{}: no grammar recognizes this document", document.name);
            result.unclassified.push(document.name.clone());
        }
    }
    result
}

/// Extract a batch of documents. Results are merged in input order.
pub fn extract_documents(documents: &[Document], registry: &Registry, config: &ImportConfig) -> ExtractionResult {
    extract_documents_until(documents, registry, config, &AtomicBool::new(false))
}

/// Like [`extract_documents`]; once `cancel` is set, documents not yet
/// started are skipped.
pub fn extract_documents_until(
    documents: &[Document],
    registry: &Registry,
    config: &ImportConfig,
    cancel: &AtomicBool,
) -> ExtractionResult {
    let extract = |document: &Document| -> Option<ExtractionResult> {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("{}: skipped, batch cancelled", document.name);
            return None;
        }
        Some(extract_document(document, registry))
    };

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let results: Vec<ExtractionResult> = if !config.parallel || workers < 2 || documents.len() < 2 {
        documents.iter().filter_map(extract).collect()
    } else {
        let chunk_size = documents.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = documents
                .chunks(chunk_size)
                .map(|chunk| (chunk, scope.spawn(move || chunk.iter().filter_map(extract).collect::<Vec<_>>())))
                .collect();

            handles
                .into_iter()
                .flat_map(|(chunk, handle)| match handle.join() {
                    Ok(results) => results,
                    Err(_) => chunk.iter().map(aborted).collect(),
                })
                .collect()
        })
    };

    let mut merged = ExtractionResult::default();
    for result in results {
        merged.merge(result);
    }
    merged.items = with_security_items(merged.items);

    log::info!(
        "Extracted {} documents: {} items, {} errors, {} unclassified",
        documents.len(),
        merged.items.len(),
        merged.errors.len(),
        merged.unclassified.len()
    );
    merged
}

fn aborted(document: &Document) -> ExtractionResult {
    ExtractionResult {
        errors: vec![ExtractionError::Unreadable {
            document: document.name.clone(),
            reason: "extraction aborted".to_string(),
        }],
        ..Default::default()
    }
}

/// Insert one security item ahead of the first transaction referencing each
/// distinct security of the batch
pub(crate) fn with_security_items(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        if let Some(security) = item.security() {
            if let Some(key) = security.key() {
                if seen.insert(key) {
                    out.push(Item::new(ItemKind::Security(security.clone()), item.source.clone()));
                }
            }
        }
        out.push(item);
    }
    out
}

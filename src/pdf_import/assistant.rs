//! Picks the grammar for a document.
//!
//! Order: PDF author tag, then a precheck for securities named after an
//! institution, then the institutions' identifying text fragments.

use super::{Document, Grammar, Registry};

/// Securities issued by institutions whose name is also a bank identifier.
/// A document mentioning one of them may be from any bank.
pub const PRECHECK_ISINS: &[(&str, &str)] = &[
    ("DE0005140008", "Deutsche Bank"),
    ("DE000CBK1001", "Commerzbank"),
    ("ES0113211835", "BBVA"),
    ("ES0113900J37", "Banco Santander"),
    ("CH0244767585", "UBS"),
    ("DE0005088108", "Baader Bank"),
];

#[derive(Debug)]
pub enum Dispatch<'r> {
    Matched(&'r Grammar),
    /// The text mentions an institution security; left for manual classification
    Deferred { isin: &'static str },
    Unmatched,
}

pub fn find_matching_grammar<'r>(document: &Document, registry: &'r Registry) -> Dispatch<'r> {
    if let Some(author) = document.author.as_deref().map(str::trim) {
        if let Some(grammar) = registry.grammars().iter().find(|g| g.author == Some(author)) {
            return Dispatch::Matched(grammar);
        }
    }

    if let Some((isin, _)) = PRECHECK_ISINS.iter().find(|(isin, _)| document.text.contains(isin)) {
        return Dispatch::Deferred { isin: *isin };
    }

    registry
        .grammars()
        .iter()
        .find(|g| identifies(g, &document.text))
        .map_or(Dispatch::Unmatched, Dispatch::Matched)
}

fn identifies(grammar: &Grammar, text: &str) -> bool {
    if grammar.bank_identifiers.is_empty() {
        return text.contains(grammar.label);
    }
    grammar.bank_identifiers.iter().any(|id| text.contains(id))
}

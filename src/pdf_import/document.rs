//! Text of an imported document.
//!
//! PDF rendering happens upstream: the import engine only ever sees the
//! extracted text, split into lines.

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Document text plus the metadata used to pick a grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// File name, used as item source and in error reports
    pub name: String,
    /// PDF author field, when the producer fills it in
    pub author: Option<String>,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: None,
            text: text.into(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        let author = author.into();
        self.author = (!author.trim().is_empty()).then_some(author);
        self
    }

    /// Parse a text dump whose first line may carry `Author: <value>`
    pub fn from_dump(name: impl Into<String>, dump: &str) -> Self {
        match dump.split_once('\n') {
            Some((first, rest)) if first.starts_with("Author:") => {
                let author = first.trim_start_matches("Author:").trim();
                Self::new(name, rest).with_author(author)
            }
            _ => Self::new(name, dump),
        }
    }

    /// Lines without trailing whitespace
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().map(str::trim_end).collect()
    }

    /// Documents without any printable text cannot be classified
    pub fn check_readable(&self) -> Result<(), ExtractionError> {
        if self.text.trim().is_empty() {
            return Err(ExtractionError::Unreadable {
                document: self.name.clone(),
                reason: "document contains no text".to_string(),
            });
        }
        if self.text.contains('\u{0}') || self.text.contains('\u{FFFD}') {
            return Err(ExtractionError::Unreadable {
                document: self.name.clone(),
                reason: "document text is not decodable".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_trimmed_at_the_end() {
        let doc = Document::new("a.txt", "Compra  \n  Valor\r\n");
        assert_eq!(doc.lines(), vec!["Compra", "  Valor"]);
    }

    #[test]
    fn test_from_dump_reads_author() {
        let doc = Document::from_dump("a.txt", "Author: Swissquote Bank AG\nBörsentransaktion: Kauf");
        assert_eq!(doc.author.as_deref(), Some("Swissquote Bank AG"));
        assert_eq!(doc.lines().len(), 1);

        let doc = Document::from_dump("b.txt", "Author: \nText");
        assert_eq!(doc.author, None);

        let doc = Document::from_dump("c.txt", "Text");
        assert_eq!(doc.author, None);
        assert_eq!(doc.text, "Text");
    }

    #[test]
    fn test_unreadable() {
        assert!(Document::new("a.pdf", "  \n ").check_readable().is_err());
        assert!(Document::new("a.pdf", "x\u{0}y").check_readable().is_err());
        assert!(Document::new("a.pdf", "Kauf").check_readable().is_ok());
    }
}

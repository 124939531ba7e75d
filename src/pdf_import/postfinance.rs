//! PostFinance PDF Grammar
//!
//! Annual account fees and payments between the CHF, EUR and USD accounts.

use super::extractor_utils::consistent_rate;
use super::{BankGrammar, Block, DocumentType, Draft, DraftKind, NumberFormat, ParsedData, Recipe, Section};
use crate::error::FieldError;
use crate::pp::{AccountTransactionType, ForexInfo, TransactionUnit};

pub struct PostfinanceGrammar {
    detect_patterns: Vec<&'static str>,
}

impl PostfinanceGrammar {
    pub fn new() -> Self {
        Self {
            detect_patterns: vec!["PostFinance"],
        }
    }
}

impl Default for PostfinanceGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl BankGrammar for PostfinanceGrammar {
    fn label(&self) -> &'static str {
        "PostFinance"
    }

    fn bank_identifiers(&self) -> &[&'static str] {
        &self.detect_patterns
    }

    fn number_format(&self) -> NumberFormat {
        NumberFormat::Swiss
    }

    fn date_formats(&self) -> &'static [&'static str] {
        &["%d.%m.%Y"]
    }

    fn document_types(&self) -> Vec<DocumentType> {
        vec![annual_fee(), payment()]
    }
}

fn annual_fee() -> DocumentType {
    let recipe = Recipe::new(|| Draft::account(AccountTransactionType::Fees)).section(
        Section::new(&["date", "currency", "amount"])
            .match_line(r"Valutadatum (?<date>\d{2}\.\d{2}\.\d{4})")
            .match_line(r"Betrag belastet (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)")
            .assign(|t, v, _| {
                t.date = Some(v.date("date")?);
                t.amount = Some(v.money("currency", "amount")?);
                Ok(())
            }),
    );

    DocumentType::new("Jahresgebühr").block(Block::new("Jahresgebühr .*").recipe(recipe))
}

/// Payment from one currency account to another. The source leg carries
/// the amount it lost as gross value with the target amount as forex.
fn payment() -> DocumentType {
    let recipe = Recipe::new(|| Draft::new(DraftKind::AccountTransfer)).one_of(vec![
        // Valutadatum 03.02.2025
        // Betrag belastet CHF 1'000.00
        // Wechselkurs 0.9216
        // Total EUR 921.60
        Section::new(&["date", "currencyTo", "amountTo", "exchangeRate", "currencyFrom", "amountFrom"])
            .match_line(r"Valutadatum (?<date>\d{2}\.\d{2}\.\d{4})")
            .match_line(r"Betrag belastet (?<currencyTo>[A-Z]{3}) (?<amountTo>[\d',.]+)")
            .match_line(r"Wechselkurs (?<exchangeRate>[\d',.]+)")
            .match_line(r"Total (?<currencyFrom>[A-Z]{3}) (?<amountFrom>[\d',.]+)")
            .assign(|t, v, _| set_transfer(t, v)),
        // Valutadatum 03.02.2025
        // Gutgeschriebener Betrag USD 500.00
        // Wechselkurs 0.8790
        // Total CHF 439.50
        Section::new(&["date", "currencyFrom", "amountFrom", "exchangeRate", "currencyTo", "amountTo"])
            .match_line(r"Valutadatum (?<date>\d{2}\.\d{2}\.\d{4})")
            .match_line(r"Gutgeschriebener Betrag (?<currencyFrom>[A-Z]{3}) (?<amountFrom>[\d',.]+)")
            .match_line(r"Wechselkurs (?<exchangeRate>[\d',.]+)")
            .match_line(r"Total (?<currencyTo>[A-Z]{3}) (?<amountTo>[\d',.]+)")
            .assign(|t, v, _| set_transfer(t, v)),
    ]);

    DocumentType::new("Zahlungsverkehr").block(Block::new("Zahlungsverkehr .*").recipe(recipe))
}

fn set_transfer(t: &mut Draft, v: &ParsedData) -> Result<(), FieldError> {
    let source = v.money("currencyFrom", "amountFrom")?;
    let target = v.money("currencyTo", "amountTo")?;
    let rate = consistent_rate(&source, &target, v.exchange_rate("exchangeRate")?);

    t.date = Some(v.date("date")?);
    if source.currency != target.currency {
        t.add_unit(TransactionUnit::gross_value(source.clone()).with_forex(ForexInfo::new(target.clone(), rate)));
    }
    t.amount = Some(source);
    t.target_amount = Some(target);
    Ok(())
}

//! DKB (Deutsche Kreditbank) PDF Grammar
//!
//! Contract notes ("Wertpapier Abrechnung"), dividend and coupon advices.

use super::extractor_utils::{fee_section, tax_section};
use super::{BankGrammar, Block, DocumentType, Draft, NumberFormat, Recipe, Section};
use crate::models::SecurityDraft;
use crate::pp::{AccountTransactionType, PortfolioTransactionType};

pub struct DkbGrammar {
    detect_patterns: Vec<&'static str>,
}

impl DkbGrammar {
    pub fn new() -> Self {
        Self {
            detect_patterns: vec!["Deutsche Kreditbank", "DKB AG"],
        }
    }
}

impl Default for DkbGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl BankGrammar for DkbGrammar {
    fn label(&self) -> &'static str {
        "DKB"
    }

    fn bank_identifiers(&self) -> &[&'static str] {
        &self.detect_patterns
    }

    fn number_format(&self) -> NumberFormat {
        NumberFormat::German
    }

    fn date_formats(&self) -> &'static [&'static str] {
        &["%d.%m.%Y"]
    }

    fn document_types(&self) -> Vec<DocumentType> {
        vec![
            order("Wertpapier Abrechnung Kauf", PortfolioTransactionType::Buy),
            order("Wertpapier Abrechnung Ausgabe Investmentfonds", PortfolioTransactionType::Buy),
            order("Wertpapier Abrechnung Verkauf", PortfolioTransactionType::Sell),
            income("Dividendengutschrift", AccountTransactionType::Dividends),
            income("Zinsgutschrift", AccountTransactionType::Interest),
        ]
    }
}

/// Stück 25 ALLIANZ SE VINK.NAMENS-AKTIEN O.N. DE0008404005 (840400)
/// EUR 5.000,00 BUNDESREP.DEUTSCHLAND ANL.V.2014 (2030) DE0001102309 (110230)
///
/// Bonds are quoted in percent of the nominal value.
fn security_section() -> Section {
    Section::new(&["notation", "shares", "name", "isin", "wkn"])
        .find(r"^Nominale Wertpapierbezeichnung ISIN \(WKN\)$")
        .match_line(
            r"(?<notation>St.ck|[A-Z]{3}) (?<shares>[.,\d]+) (?<name>.*) (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9]) \((?<wkn>[A-Z0-9]{6})\)",
        )
        .assign(|t, v, _| {
            let shares = v.shares("shares")?;
            let notation = v.get("notation")?;
            t.shares = Some(if notation.starts_with("St") { shares } else { shares / 100 });

            let security = t.security_mut();
            security.name = Some(v.get("name")?.to_string());
            security.isin = Some(v.get("isin")?.to_string());
            security.wkn = Some(v.get("wkn")?.to_string());
            Ok(())
        })
}

/// Statements settle in the trading currency
fn settle_in_security_currency(t: &mut Draft) {
    let Some(currency) = t.currency().map(str::to_string) else {
        return;
    };
    let security = t.security.get_or_insert_with(|| SecurityDraft::new(currency.clone()));
    if security.currency.is_empty() {
        security.currency = currency;
    }
}

fn with_german_taxes(recipe: Recipe) -> Recipe {
    recipe
        // Kapitalertragsteuer 25,00 % auf 400,00 EUR 100,00- EUR
        .section(tax_section(r"Kapitalertragsteuer .* [A-Z]{3} (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})"))
        // Solidaritätszuschlag 5,50 % auf 100,00 EUR 5,50- EUR
        .section(tax_section(r"Solidarit.tszuschlag .* [A-Z]{3} (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})"))
        // Kirchensteuer 8 % auf 66,02 EUR 5,28- EUR
        .section(tax_section(r"Kirchensteuer .* [A-Z]{3} (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})"))
        // Anrechenbare Quellensteuer 15 % auf 40,00 EUR 6,00 EUR
        .section(tax_section(r"Anrechenbare Quellensteuer .* [A-Z]{3} (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})"))
}

fn order(title: &'static str, tx_type: PortfolioTransactionType) -> DocumentType {
    let recipe = Recipe::new(move || Draft::buy_sell(tx_type))
        .section(security_section())
        .one_of(vec![
            // Schlusstag/-Zeit 12.03.2025 09:04:23 Auftraggeber Max Mustermann
            Section::new(&["date", "time"])
                .match_line(r"Schlusstag/-Zeit (?<date>\d{2}\.\d{2}\.\d{4}) (?<time>\d{2}:\d{2}:\d{2}).*")
                .assign(|t, v, _| {
                    t.date = Some(v.date_time("date", "time")?);
                    Ok(())
                }),
            Section::new(&["date"])
                .match_line(r"Schlusstag (?<date>\d{2}\.\d{2}\.\d{4}).*")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
            // Den Gegenwert buchen wir mit Valuta 14.03.2025 zu Lasten des Kontos ...
            Section::new(&["date"])
                .match_line(r"Den Gegenwert buchen wir mit Valuta (?<date>\d{2}\.\d{2}\.\d{4}) .*")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        ])
        // Ausmachender Betrag 7.820,00- EUR
        .section(
            Section::new(&["amount", "currency"])
                .match_line(r"Ausmachender Betrag (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    settle_in_security_currency(t);
                    Ok(())
                }),
        )
        // Provision 10,00- EUR
        .section(fee_section(r"Provision (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})"));

    DocumentType::new(title).block(Block::new(title).recipe(with_german_taxes(recipe)))
}

fn income(title: &'static str, tx_type: AccountTransactionType) -> DocumentType {
    let recipe = Recipe::new(move || Draft::account(tx_type))
        .section(security_section())
        // Ausmachender Betrag 195,07 EUR
        // Lagerstelle Clearstream Banking AG
        // Den Betrag buchen wir mit Wertstellung 06.05.2025 zu Gunsten des Kontos ...
        .section(
            Section::new(&["amount", "currency", "date"])
                .match_line(r"Ausmachender Betrag (?<amount>[.,\d]+)-? (?<currency>[A-Z]{3})")
                .match_line(r"Lagerstelle .*")
                .match_line(r"Den Betrag buchen wir mit Wertstellung (?<date>\d{2}\.\d{2}\.\d{4}) .*")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    t.date = Some(v.date("date")?);
                    settle_in_security_currency(t);
                    Ok(())
                }),
        );

    DocumentType::new(title).block(Block::new(title).recipe(with_german_taxes(recipe)))
}

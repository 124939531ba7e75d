//! Swissquote PDF Grammar
//!
//! Stock exchange transactions, dividends, capital gain distributions and
//! custody fees. Amounts use the Swiss number format (1'234.56).

use super::extractor_utils::{consistent_rate, fee_section, tax_section};
use super::{BankGrammar, Block, DocumentType, Draft, NumberFormat, Recipe, Section};
use crate::models::SecurityDraft;
use crate::pp::{AccountTransactionType, ForexInfo, Money, PortfolioTransactionType, TransactionUnit};

pub struct SwissquoteGrammar {
    detect_patterns: Vec<&'static str>,
}

impl SwissquoteGrammar {
    pub fn new() -> Self {
        Self {
            detect_patterns: vec!["Swissquote"],
        }
    }
}

impl Default for SwissquoteGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl BankGrammar for SwissquoteGrammar {
    fn label(&self) -> &'static str {
        "Swissquote"
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
        vec![
            trade(
                "Kauf",
                PortfolioTransactionType::Buy,
                "Zu Ihren Lasten",
                r"Betrag belastet auf Kontonummer\s+\d+,\s+Valutadatum\s(?<date>\d{2}\.\d{2}\.\d{4})",
            ),
            trade(
                "Verkauf",
                PortfolioTransactionType::Sell,
                "Zu Ihren Gunsten",
                r"Betrag gutgeschrieben auf Ihrer Kontonummer\s+\d+,\s+Valutadatum\s(?<date>\d{2}\.\d{2}\.\d{4})",
            ),
            DocumentType::new("Dividende").block(Block::new("Dividende Unsere Referenz.*").recipe(income())),
            DocumentType::new("Kapitalgewinn").block(Block::new("Kapitalgewinn Unsere Referenz.*").recipe(income())),
            custody_fees(),
        ]
    }
}

fn trade(
    keyword: &'static str,
    tx_type: PortfolioTransactionType,
    settlement: &'static str,
    value_date: &'static str,
) -> DocumentType {
    let recipe = Recipe::new(move || Draft::buy_sell(tx_type))
        // Titel Ort der Ausführung
        // APPLE ORD ISIN: US0378331005 NASDAQ
        // 20 210.50 USD 4'210.00
        // Zu Ihren Lasten CHF 3'542.50
        .section(
            Section::new(&["name", "isin", "shares", "currency", "transactionCurrency", "amount"])
                .find(r"^Titel Ort der Ausf.hrung$")
                .match_line(r"(?<name>.*) ISIN: (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9]) .*")
                .match_line(r"(?<shares>[\d',.]+) [\d',.]+ (?<currency>[A-Z]{3}) [\d',.]+")
                .match_line(&format!(r"{} (?<transactionCurrency>[A-Z]{{3}}) (?<amount>[\d',.]+)", settlement))
                .assign(|t, v, _| {
                    t.security = Some(SecurityDraft {
                        name: Some(v.get("name")?.to_string()),
                        isin: Some(v.get("isin")?.to_string()),
                        ..SecurityDraft::new(v.currency("currency")?)
                    });
                    t.shares = Some(v.shares("shares")?);
                    t.amount = Some(v.money("transactionCurrency", "amount")?);
                    Ok(())
                }),
        )
        // Fees in another currency are not booked
        .section(fee_section(r"Kommission Swissquote Bank AG (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)"))
        .section(tax_section(r"Abgabe \(Eidg\. Stempelsteuer\) (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)"))
        .section(fee_section(r"B.rsengeb.hren (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)"))
        // Total USD 4'210.00
        // Wechselkurs 0.8358
        // CHF 3'518.72
        .section(
            Section::new(&["forexCurrency", "forexAmount", "exchangeRate", "currency", "amount"])
                .optional()
                .match_line(r"Total (?<forexCurrency>[A-Z]{3}) (?<forexAmount>[\d',.]+)")
                .match_line(r"Wechselkurs (?<exchangeRate>[\d',.]+)")
                .match_line(r"(?<currency>[A-Z]{3}) (?<amount>[\d',.]+)")
                .assign(|t, v, _| {
                    let forex = v.money("forexCurrency", "forexAmount")?;
                    if t.security_currency() != Some(forex.currency.as_str()) {
                        return Ok(());
                    }
                    let gross = v.money("currency", "amount")?;
                    // Some rates are printed scaled (DKK/CHF 15.42 for 0.1542)
                    let rate = consistent_rate(&gross, &forex, v.exchange_rate("exchangeRate")?);
                    t.add_unit(TransactionUnit::gross_value(gross).with_forex(ForexInfo::new(forex, rate)));
                    Ok(())
                }),
        )
        .section(Section::new(&["date"]).match_line(value_date).assign(|t, v, _| {
            t.date = Some(v.date("date")?);
            Ok(())
        }));

    let title = format!("Börsentransaktion: {}", keyword);
    DocumentType::new(&title).block(Block::new(&format!("{} .*", title)).recipe(recipe))
}

/// Dividends and capital gain distributions. Withholding tax is the
/// difference between the gross and the credited amount.
fn income() -> Recipe {
    Recipe::new(|| Draft::account(AccountTransactionType::Dividends))
        // HARVEST CAPITAL CREDIT ORD ISIN: US41753F1093NKN: 350
        .section(
            Section::new(&["name", "isin"])
                .match_line(r"(?<name>.*) ISIN: (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9])NKN.*")
                .assign(|t, v, _| {
                    let security = t.security_mut();
                    security.name = Some(v.get("name")?.to_string());
                    security.isin = Some(v.get("isin")?.to_string());
                    Ok(())
                }),
        )
        .section(
            Section::new(&["date"])
                .match_line(r"Ausf.hrungsdatum (?<date>\d{2}\.\d{2}\.\d{4})")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        )
        // Anzahl 350
        // Betrag USD 28.00
        // Total USD 23.80
        .section(
            Section::new(&["shares", "grossCurrency", "gross", "currency", "amount"])
                .match_line(r"Anzahl (?<shares>[\d',.]+)")
                .match_line(r"Betrag (?<grossCurrency>[A-Z]{3}) (?<gross>[\d',.]+)")
                .match_line(r"Total (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)")
                .assign(|t, v, _| {
                    let amount = v.money("currency", "amount")?;
                    let gross = v.money("grossCurrency", "gross")?;
                    t.shares = Some(v.shares("shares")?);
                    t.security_mut().currency = amount.currency.clone();
                    if gross.currency == amount.currency {
                        let tax = gross.subtract(&amount)?;
                        if tax.amount > 0 {
                            t.add_unit(TransactionUnit::tax(tax));
                        }
                    }
                    t.amount = Some(amount);
                    Ok(())
                }),
        )
}

fn custody_fees() -> DocumentType {
    let recipe = Recipe::new(|| Draft::account(AccountTransactionType::Fees))
        // Valutadatum 30.06.2025
        // Betrag belastet CHF 26.95
        .section(
            Section::new(&["date", "currency", "amount"])
                .match_line(r"Valutadatum (?<date>\d{2}\.\d{2}\.\d{4})")
                .match_line(r"Betrag belastet (?<currency>[A-Z]{3}) (?<amount>[\d',.]+)")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        );

    DocumentType::new("Depotgebühren").block(Block::new("Depotgebühren Unsere Referenz.*").recipe(recipe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, ItemKind};
    use crate::pdf_import::{Document, Grammar};
    use crate::pp::{Transaction, UnitType};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const KAUF01: &str = r"Swissquote Bank AG
Börsentransaktion: Kauf Unsere Referenz: 12345678
Gemäss Ihrem Kaufauftrag vom 14.05.2025 haben wir folgende Transaktionen vorgenommen:
Titel Ort der Ausführung
APPLE ORD ISIN: US0378331005 NASDAQ
Anzahl Preis Betrag
20 210.50 USD 4'210.00
Total USD 4'210.00
Wechselkurs 0.8358
CHF 3'518.72
Kommission Swissquote Bank AG CHF 17.65
Abgabe (Eidg. Stempelsteuer) CHF 5.28
Börsengebühren CHF 0.85
Zu Ihren Lasten CHF 3'542.50
Betrag belastet auf Kontonummer  12345600,  Valutadatum 16.05.2025
";

    const VERKAUF01: &str = r"Swissquote Bank AG
Börsentransaktion: Verkauf Unsere Referenz: 23456789
Titel Ort der Ausführung
NESTLE N ISIN: CH0038863350 SIX Swiss Exchange
Anzahl Preis Betrag
15 88.40 CHF 1'326.00
Kommission Swissquote Bank AG CHF 9.85
Abgabe (Eidg. Stempelsteuer) CHF 0.99
Börsengebühren CHF 1.70
Zu Ihren Gunsten CHF 1'313.46
Betrag gutgeschrieben auf Ihrer Kontonummer  12345600,  Valutadatum 05.06.2025
";

    const DIVIDENDE01: &str = r"Swissquote Bank AG
Dividende Unsere Referenz: 32484929
Gemäss Ihrem Depotbestand sind wir beauftragt, Ihnen folgende Dividende gutzuschreiben:
HARVEST CAPITAL CREDIT ORD ISIN: US41753F1093NKN: 350
Anzahl 350
Dividende 0.08 USD
Betrag USD 28.00
Verrechnungssteuer 15% (US-Quellensteuer) USD -4.20
Total USD 23.80
Ausführungsdatum 27.03.2014
";

    const DEPOTGEBUEHREN01: &str = r"Swissquote Bank AG
Depotgebühren Unsere Referenz: 99887766
Valutadatum 30.06.2025
Betrag belastet CHF 26.95
";

    fn extract(name: &str, text: &str) -> Item {
        let grammar = Grammar::compile("swissquote", &SwissquoteGrammar::new()).unwrap();
        let mut result = grammar.extract(&Document::new(name, text));
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.items.len(), 1);
        result.items.remove(0)
    }

    #[test]
    fn test_kauf01_in_foreign_currency() {
        let item = extract("Kauf01.txt", KAUF01);
        let ItemKind::BuySell(entry) = &item.kind else {
            panic!("expected buy/sell");
        };
        assert_eq!(entry.security.name.as_deref(), Some("APPLE ORD"));
        assert_eq!(entry.security.currency, "USD");

        let tx = &entry.portfolio_transaction;
        assert_eq!(tx.date.to_string(), "2025-05-16 00:00:00");
        assert_eq!(tx.shares, 2_000_000_000);
        assert_eq!(tx.amount, Money::new(354250, "CHF"));
        assert_eq!(tx.total_fees().unwrap(), 1765 + 85);
        assert_eq!(tx.total_taxes().unwrap(), 528);

        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(351872, "CHF"));
        let forex = gross.forex.as_ref().unwrap();
        assert_eq!(forex.amount, Money::new(421000, "USD"));
        assert_eq!(forex.exchange_rate, dec!(0.8358));
        assert_eq!(tx.gross_value().unwrap(), gross.amount);
    }

    #[test]
    fn test_scaled_exchange_rate_falls_back_to_implied_rate() {
        let item = extract("Kauf02.txt", &KAUF01.replace("Wechselkurs 0.8358", "Wechselkurs 83.58"));
        let gross = item.primary_leg().unwrap().1.unit(UnitType::GrossValue).cloned().unwrap();
        let rate = gross.forex.as_ref().unwrap().exchange_rate;
        assert_ne!(rate, dec!(83.58));
        assert!(gross.is_forex_consistent(1));
    }

    #[test]
    fn test_verkauf01() {
        let item = extract("Verkauf01.txt", VERKAUF01);
        let ItemKind::BuySell(entry) = &item.kind else {
            panic!("expected buy/sell");
        };
        let tx = &entry.portfolio_transaction;
        assert_eq!(tx.transaction_type, PortfolioTransactionType::Sell);
        assert_eq!(tx.amount, Money::new(131346, "CHF"));
        assert_eq!(tx.gross_value().unwrap(), Money::new(132600, "CHF"));
        assert!(tx.unit(UnitType::GrossValue).is_none());
    }

    #[test]
    fn test_dividende01_tax_is_gross_minus_net() {
        let item = extract("Dividende01.txt", DIVIDENDE01);
        let ItemKind::AccountTransaction(entry) = &item.kind else {
            panic!("expected dividend");
        };
        assert_eq!(entry.security.as_ref().unwrap().isin.as_deref(), Some("US41753F1093"));
        assert_eq!(entry.security.as_ref().unwrap().currency, "USD");

        let tx = &entry.transaction;
        assert_eq!(tx.transaction_type, AccountTransactionType::Dividends);
        assert_eq!(tx.date.to_string(), "2014-03-27 00:00:00");
        assert_eq!(tx.shares, Some(35_000_000_000));
        assert_eq!(tx.amount, Money::new(2380, "USD"));
        assert_eq!(tx.total_taxes().unwrap(), 420);
    }

    #[test]
    fn test_kapitalgewinn_uses_dividend_recipe() {
        let text = DIVIDENDE01.replace("Dividende Unsere Referenz", "Kapitalgewinn Unsere Referenz");
        let item = extract("Kapitalgewinn01.txt", &text);
        assert_eq!(item.type_str(), "DIVIDENDS");
        assert_eq!(item.amount(), Some(&Money::new(2380, "USD")));
    }

    #[test]
    fn test_depotgebuehren01() {
        let item = extract("Depotgebuehren01.txt", DEPOTGEBUEHREN01);
        assert_eq!(item.type_str(), "FEES");
        assert_eq!(item.amount(), Some(&Money::new(2695, "CHF")));
        assert_eq!(item.date().unwrap().to_string(), "2025-06-30 00:00:00");
        assert!(item.security().is_none());
    }
}

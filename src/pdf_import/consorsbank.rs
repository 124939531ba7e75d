//! Consorsbank PDF Grammar
//!
//! Order statements, dividend and distribution advices (layout since Q4 2017)
//! and subsequent tax adjustments.

use super::extractor_utils::{check_and_set_gross_unit, fee_section, tax_section};
use super::{BankGrammar, Block, DocumentType, Draft, DraftKind, NumberFormat, Recipe, Section};
use crate::currency::ExchangeRate;
use crate::models::SecurityDraft;
use crate::pp::{AccountTransactionType, PortfolioTransactionType};

pub struct ConsorsbankGrammar {
    detect_patterns: Vec<&'static str>,
}

impl ConsorsbankGrammar {
    pub fn new() -> Self {
        Self {
            detect_patterns: vec!["Consorsbank", "Cortal Consors"],
        }
    }
}

impl Default for ConsorsbankGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl BankGrammar for ConsorsbankGrammar {
    fn label(&self) -> &'static str {
        "Consorsbank"
    }

    fn author(&self) -> Option<&'static str> {
        Some("Consorsbank")
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
            order("KAUF", PortfolioTransactionType::Buy),
            order("BEZUG", PortfolioTransactionType::Buy),
            order("VERKAUF", PortfolioTransactionType::Sell),
            dividend("Dividendengutschrift", "Dividende pro Stück"),
            dividend("Ertragsgutschrift", "Ertragsausschüttung je Anteil"),
            tax_adjustment(),
        ]
    }
}

fn order(keyword: &'static str, tx_type: PortfolioTransactionType) -> DocumentType {
    let block_start = format!("{} AM .*", keyword);

    let recipe = Recipe::new(move || Draft::buy_sell(tx_type))
        // Wertpapier WKN ISIN
        // BAYER AG NAMENS-AKTIEN O.N. BAY001 DE000BAY0017
        // Kurs 128,95 EUR P.ST. NETTO
        .section(
            Section::new(&["name", "wkn", "isin", "currency"])
                .find(r"^(Wertpapier|Bezeichnung) WKN ISIN$")
                .match_line(r"(?<name>.*) (?<wkn>[A-Z0-9]{6}) (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9])")
                .match_line(r"(Kurs|Preis pro Anteil) [.,\d]+ (?<currency>[A-Z]{3}) .*")
                .assign(|t, v, _| {
                    t.security = Some(SecurityDraft {
                        name: Some(v.get("name")?.to_string()),
                        wkn: Some(v.get("wkn")?.to_string()),
                        isin: Some(v.get("isin")?.to_string()),
                        ..SecurityDraft::new(v.currency("currency")?)
                    });
                    Ok(())
                }),
        )
        .section(
            Section::new(&["shares"])
                .find(r"^Einheit Umsatz( F.lligkeit)?$")
                .match_line(r"ST (?<shares>[.,\d]+).*")
                .assign(|t, v, _| {
                    t.shares = Some(v.shares("shares")?);
                    Ok(())
                }),
        )
        // Subscriptions carry no execution time; the value date is the trade date
        .one_of(vec![
            Section::new(&["date", "time"])
                .match_line(&format!(r"{} AM (?<date>\d{{2}}\.\d{{2}}\.\d{{4}})\s+UM (?<time>\d{{2}}:\d{{2}}:\d{{2}}).*", keyword))
                .assign(|t, v, _| {
                    t.date = Some(v.date_time("date", "time")?);
                    Ok(())
                }),
            Section::new(&["date"])
                .match_line(r"Wert (?<date>\d{2}\.\d{2}\.\d{4}) [A-Z]{3} [.,\d]+")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        ])
        // Wert 05.06.2015 EUR 1.225,30
        .section(
            Section::new(&["currency", "amount"])
                .match_line(r"Wert \d{2}\.\d{2}\.\d{4} (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["note"])
                .optional()
                .find(r"(?<note>Sparplan(ausführung)?)")
                .assign(|t, v, _| {
                    t.note = Some(v.get("note")?.to_string());
                    Ok(())
                }),
        )
        .section(fee_section(r".*B.rsenplatzgeb.hr (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        .section(fee_section(r".*Provision (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        .section(fee_section(r".*Handelsentgelt (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        .section(fee_section(r".*Grundgeb.hr (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        .section(fee_section(r".*Consorsbank Ausgabegeb.hr.*% (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        .section(fee_section(r".*Eig\. Spesen (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)"))
        // KAPST 25,00 % EUR 50,00
        .section(tax_section(r"KAPST .* (?<currency>[A-Z]{3}) +(?<amount>[.,\d]+) *"))
        .section(tax_section(r"SOLZ .* (?<currency>[A-Z]{3}) +(?<amount>[.,\d]+) *"))
        .section(tax_section(r"KIST .* (?<currency>[A-Z]{3}) +(?<amount>[.,\d]+) *"));

    DocumentType::new(keyword).block(Block::new(&block_start).recipe(recipe))
}

fn dividend(title: &'static str, per_share_label: &'static str) -> DocumentType {
    let recipe = Recipe::new(|| Draft::account(AccountTransactionType::Dividends))
        // Wertpapierbezeichnung WKN ISIN
        // ROYAL DUTCH SHELL PLC REG. SHARES CLASS A EO -,07 A0D94M GB00B03MLX29
        // Dividende pro Stück 0,47 USD Schlusstag 16.11.2017
        .section(
            Section::new(&["name", "wkn", "isin", "currency"])
                .find(r"^Wertpapierbezeichnung WKN ISIN$")
                .match_line(r"(?<name>.*) (?<wkn>[A-Z0-9]{6}) (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9])")
                .match_line(&format!(r"{} [.,\d]+ (?<currency>[A-Z]{{3}}).*", per_share_label))
                .assign(|t, v, _| {
                    t.security = Some(SecurityDraft {
                        name: Some(v.get("name")?.to_string()),
                        wkn: Some(v.get("wkn")?.to_string()),
                        isin: Some(v.get("isin")?.to_string()),
                        ..SecurityDraft::new(v.currency("currency")?)
                    });
                    Ok(())
                }),
        )
        // Netto zugunsten IBAN DE12 3456 7890 1234 5678 90 44,46 EUR
        .section(
            Section::new(&["amount", "currency"])
                .match_line(r"Netto zugunsten IBAN .* (?<amount>[.,\d]+) (?<currency>[A-Z]{3})")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["shares"])
                .match_line(r"(?<shares>[.,\d]+) Stück")
                .assign(|t, v, _| {
                    t.shares = Some(v.shares("shares")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["date"])
                .match_line(r"Valuta (?<date>\d{2}\.\d{2}\.\d{4}).*")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        )
        // Brutto in USD 70,50 USD
        // Devisenkurs 1,180600 USD / EUR
        // Brutto in EUR 59,72 EUR
        .section(
            Section::new(&["fxGross", "fxCurrency", "exchangeRate", "termCurrency", "baseCurrency", "gross", "currency"])
                .optional()
                .match_line(r"Brutto in [A-Z]{3} (?<fxGross>[.,\d]+) (?<fxCurrency>[A-Z]{3})")
                .match_line(r"Devisenkurs (?<exchangeRate>[.,\d]+) (?<termCurrency>[A-Z]{3}) / (?<baseCurrency>[A-Z]{3})")
                .match_line(r"Brutto in [A-Z]{3} (?<gross>[.,\d]+) (?<currency>[A-Z]{3})")
                .assign(|t, v, ctx| {
                    ctx.exchange_rate = Some(ExchangeRate::new(
                        v.exchange_rate("exchangeRate")?,
                        v.currency("baseCurrency")?,
                        v.currency("termCurrency")?,
                    ));
                    let gross = v.money("currency", "gross")?;
                    let fx_gross = v.money("fxCurrency", "fxGross")?;
                    check_and_set_gross_unit(t, gross, fx_gross, ctx);
                    Ok(())
                }),
        )
        // abzgl. Quellensteuer 15,00 % von 70,50 USD 10,58 USD
        .section(tax_section(r"abzgl\. Quellensteuer .* [A-Z]{3} (?<amount>[.,\d]+) (?<currency>[A-Z]{3})"))
        .section(tax_section(r"abzgl\. Kapitalertragsteuer .* [A-Z]{3} (?<amount>[.,\d]+) (?<currency>[A-Z]{3})"))
        .section(tax_section(r"abzgl\. Solidarit.tszuschlag .* [A-Z]{3} (?<amount>[.,\d]+) (?<currency>[A-Z]{3})"))
        .section(tax_section(r"abzgl\. Kirchensteuer .* [A-Z]{3} (?<amount>[.,\d]+) (?<currency>[A-Z]{3})"))
        .wrap_if(|t| t.amount.as_ref().is_some_and(|m| !m.is_zero()));

    DocumentType::new(title).block(Block::new(&format!("{}.*", title)).recipe(recipe))
}

/// Statements print no currency; adjustments are always booked in EUR
fn tax_adjustment() -> DocumentType {
    let recipe = Recipe::new(|| Draft::account(AccountTransactionType::TaxRefund))
        .section(
            Section::new(&["date"])
                .optional()
                .match_line(r"\s*Den Steuerausgleich buchen wir mit Wertstellung (?<date>\d{2}\.\d{2}\.\d{4}).*")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        )
        //  Erstattung/Belastung (-) von Steuern
        //  ...
        //  ======================================================================
        //                                                                  90,61
        .section(
            Section::new(&["amount", "sign"])
                .find(r"^\s*Erstattung/Belastung \(-\) von Steuern\s*$")
                .match_line(r"\s*=+\s*")
                .match_line(r"\s*(?<amount>[.,\d]+)(?<sign>-?).*")
                .assign(|t, v, _| {
                    t.amount = Some(v.amount_in("amount", "EUR")?);
                    if v.get("sign")? == "-" {
                        t.kind = DraftKind::Account(AccountTransactionType::Taxes);
                    }
                    Ok(())
                }),
        )
        .wrap_if(|t| t.amount.as_ref().is_some_and(|m| !m.is_zero()));

    DocumentType::new("Nachträgliche Verlustverrechnung")
        .block(Block::new(r"\s*Erstattung/Belastung \(-\) von Steuern\s*").recipe(recipe))
}

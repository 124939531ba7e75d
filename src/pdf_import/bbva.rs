//! Banco Bilbao Vizcaya Argentaria PDF Grammar
//!
//! Spanish contract notes for shares and funds, and dividend advices.
//! Foreign shares are settled in EUR with a printed "Cambio divisa".

use super::extractor_utils::{as_date_time, check_and_set_gross_unit, fee_section, fix_gross_value, tax_section};
use super::{BankGrammar, Block, DocumentType, Draft, DraftKind, NumberFormat, Recipe, Section};
use crate::currency::ExchangeRate;
use crate::models::SecurityDraft;
use crate::pp::{AccountTransactionType, PortfolioTransactionType};

pub struct BbvaGrammar {
    detect_patterns: Vec<&'static str>,
}

impl BbvaGrammar {
    pub fn new() -> Self {
        Self {
            detect_patterns: vec![
                "BANCO BILBAO VIZCAYA ARGENTARIA",
                "CARTA DE AVISO POR OPERACIONES",
                "CARTA DE ABONO POR OPERACIONES",
            ],
        }
    }
}

impl Default for BbvaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl BankGrammar for BbvaGrammar {
    fn label(&self) -> &'static str {
        "Banco Bilbao Vizcaya Argentaria"
    }

    fn bank_identifiers(&self) -> &[&'static str] {
        &self.detect_patterns
    }

    fn number_format(&self) -> NumberFormat {
        NumberFormat::German
    }

    fn date_formats(&self) -> &'static [&'static str] {
        &["%d/%m/%Y", "%d-%m-%Y"]
    }

    fn document_types(&self) -> Vec<DocumentType> {
        vec![share_order(), fund_order(), dividend()]
    }
}

fn security(name: &str, isin: &str, currency: String) -> SecurityDraft {
    SecurityDraft {
        name: Some(name.to_string()),
        isin: Some(isin.to_string()),
        ..SecurityDraft::new(currency)
    }
}

/// "Cambio divisa 1,1448 USD/EUR" followed by the gross line in USD
fn forex_section(rate_line: &str, gross_line: &str) -> Section {
    Section::new(&["exchangeRate", "termCurrency", "baseCurrency", "fxGross"])
        .match_line(rate_line)
        .match_line(gross_line)
        .assign(|t, v, ctx| {
            let rate = ExchangeRate::new(
                v.exchange_rate("exchangeRate")?,
                v.currency("baseCurrency")?,
                v.currency("termCurrency")?,
            );
            let fx_gross = v.amount_in("fxGross", &rate.term)?;
            let gross = rate.convert(&rate.base, &fx_gross)?;
            ctx.exchange_rate = Some(rate);
            check_and_set_gross_unit(t, gross, fx_gross, ctx);
            Ok(())
        })
}

fn share_order() -> DocumentType {
    let recipe = Recipe::new(|| Draft::buy_sell(PortfolioTransactionType::Buy))
        .section(
            Section::new(&["type"])
                .optional()
                .match_line(r"Te facilitamos el detalle de la operaci.n (?<type>VENTA|COMPRA) DE VALORES  que hemos liquidado en tu cuenta.")
                .assign(|t, v, _| {
                    if v.get("type")? == "VENTA" {
                        t.kind = DraftKind::BuySell(PortfolioTransactionType::Sell);
                    }
                    Ok(())
                }),
        )
        // Valor ACC.INTEL CORPORATION -USD-
        // ISIN Valor US4581401001
        // ORIGEN USD            2.100,00
        .section(
            Section::new(&["name", "isin", "currency"])
                .match_line(r"Valor (?<name>.*)")
                .match_line(r"ISIN Valor (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9])")
                .match_line(r"ORIGEN (?<currency>[A-Z]{3}).*")
                .assign(|t, v, _| {
                    t.security = Some(security(v.get("name")?, v.get("isin")?, v.currency("currency")?));
                    Ok(())
                }),
        )
        .section(
            Section::new(&["shares"])
                .match_line(r"N. de valores (?<shares>[.,\d]+)")
                .assign(|t, v, _| {
                    t.shares = Some(v.shares("shares")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["time"])
                .optional()
                .match_line(r"Hora ejecuci.n (?<time>\d{2}\.\d{2}\.\d{2})")
                .assign(|_, v, ctx| {
                    ctx.put("time", v.get("time")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["date"])
                .match_line(r"Fecha ejecuci.n (?<date>\d{1,2}/\d{1,2}/\d{4})")
                .assign(|t, v, ctx| {
                    t.date = Some(match ctx.get("time") {
                        Some(time) => as_date_time("date", v.get("date")?, time, &["%d/%m/%Y"])?,
                        None => v.date("date")?,
                    });
                    Ok(())
                }),
        )
        // IMPORTE TOTAL EUR            1.854,38
        .section(
            Section::new(&["currency", "amount"])
                .match_line(r"IMPORTE TOTAL (?<currency>[A-Z]{3})\s+-?(?<amount>[.,\d]+)")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        )
        // Cambio divisa 1,1448 USD/EUR
        // S/títulos USD                  100         21,00000000            2.100,00
        .section(forex_section(
            r"Cambio divisa (?<exchangeRate>[.,\d]+) (?<termCurrency>[A-Z]{3})/(?<baseCurrency>[A-Z]{3})",
            r"S/t.tulos [A-Z]{3}\s+\d+\s+[.,\d]+\s+-?(?<fxGross>[.,\d]+)",
        ))
        .conclude(|t, _| {
            fix_gross_value(t);
            Ok(())
        });

    DocumentType::new("(VENTA|COMPRA) DE VALORES").block(
        Block::new(r"Te facilitamos el detalle de la operaci.n (VENTA|COMPRA) DE VALORES  que hemos liquidado en tu cuenta.")
            .recipe(with_taxes_and_fees(recipe)),
    )
}

fn fund_order() -> DocumentType {
    let recipe = Recipe::new(|| Draft::buy_sell(PortfolioTransactionType::Buy))
        .section(
            Section::new(&["type"])
                .optional()
                .match_line(r"CARTA DE AVISO POR OPERACIONES DE FONDOS (?<type>SUSCRIPCI.N|REEMBOLSO) EN EFECTIVO")
                .assign(|t, v, _| {
                    if v.get("type")? == "REEMBOLSO" {
                        t.kind = DraftKind::BuySell(PortfolioTransactionType::Sell);
                    }
                    Ok(())
                }),
        )
        // CODIGO CUENTA VALOR: NOMBRE DEL FONDO ES0113925038 NUMERO PARTICIPACIONES CAMBIO DIVISA
        // 1865 1752 777 888511536 BBVA BOLSA IND. USA CUBIERTO FI 483,2315919 EUR/EUR
        .section(
            Section::new(&["isin", "name", "shares", "currency"])
                .match_line(r"CODIGO CUENTA VALOR: NOMBRE DEL FONDO (?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9]) NUMERO PARTICIPACIONES CAMBIO DIVISA")
                .match_line(r"\d+ \d+ \d+ \d+ (?<name>[\p{L}0-9\s.]+) (?<shares>[.,\d]+) (?<currency>[A-Z]{3})/[A-Z]{3}")
                .assign(|t, v, _| {
                    t.security = Some(security(v.get("name")?, v.get("isin")?, v.currency("currency")?));
                    t.shares = Some(v.shares("shares")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["date"])
                .find("FECHA EJECUCI.N")
                .match_line(r"(?<date>\d{2}-\d{2}-\d{4})")
                .assign(|t, v, _| {
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        )
        // REEMBOLSO EFECTIVO EUR 33,110418 16.000,00
        .section(
            Section::new(&["currency", "amount"])
                .find("CONCEPTO DIVISA PRECIO IMPORTE")
                .match_line(r"(SUSCRIPCIÓN|REEMBOLSO) EFECTIVO (?<currency>[A-Z]{3}) [.,\d]+ (?<amount>[.,\d]+)")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        );

    DocumentType::new("OPERACIONES DE FONDOS (SUSCRIPCI.N|REEMBOLSO) EN EFECTIVO").block(
        Block::new(r"CARTA DE AVISO POR OPERACIONES DE FONDOS (SUSCRIPCI.N|REEMBOLSO) EN EFECTIVO")
            .recipe(with_taxes_and_fees(recipe)),
    )
}

fn dividend() -> DocumentType {
    let recipe = Recipe::new(|| Draft::account(AccountTransactionType::Dividends))
        // CODIGO CUENTA VALOR VALOR (US8299331004) TIPO INTERÉS FECHA VENCIMIENTO CAMBIO DIVISA
        // 0182 2229 58 0018380492 ACC.SIRIUS XM HOLDINGS INC 28/05/2025 1,1382 USD/EUR
        // IMPORTE EFECTIVO USD 33 0,27000000 8,91
        .section(
            Section::new(&["isin", "name", "date", "currency"])
                .match_line(r"CODIGO CUENTA VALOR VALOR \((?<isin>[A-Z]{2}[A-Z0-9]{9}[0-9])\).*")
                .match_line(r"\d+ \d+ \d+ \d+ (?<name>[\p{L}0-9\s.]+) (?<date>\d{2}/\d{2}/\d{4}) [.,\d]+ [A-Z]{3}/[A-Z]{3}")
                .match_line(r"IMPORTE EFECTIVO (?<currency>[A-Z]{3}).*")
                .assign(|t, v, _| {
                    t.security = Some(security(v.get("name")?, v.get("isin")?, v.currency("currency")?));
                    t.date = Some(v.date("date")?);
                    Ok(())
                }),
        )
        // NUMERO DE VALORES IMPORTE BRUTO UNITARIO IMPORTE NETO UNITARIO
        // 33 0,27000000 USD 0,22950000 USD
        .section(
            Section::new(&["shares"])
                .find("NUMERO DE VALORES IMPORTE BRUTO UNITARIO IMPORTE NETO UNITARIO")
                .match_line(r"(?<shares>\d+) [.,\d]+ [A-Z]{3} [.,\d]+ [A-Z]{3}")
                .assign(|t, v, _| {
                    t.shares = Some(v.shares("shares")?);
                    Ok(())
                }),
        )
        .section(
            Section::new(&["currency", "amount"])
                .match_line(r"IMPORTE TOTAL (?<currency>[A-Z]{3}) (?<amount>[.,\d]+)")
                .assign(|t, v, _| {
                    t.amount = Some(v.money("currency", "amount")?);
                    Ok(())
                }),
        )
        .section(forex_section(
            r"\d+ \d+ \d+ \d+ .* (?<exchangeRate>[.,\d]+) (?<termCurrency>[A-Z]{3})/(?<baseCurrency>[A-Z]{3})",
            r"IMPORTE EFECTIVO [A-Z]{3} \d+ [.,\d]+ (?<fxGross>[.,\d]+)",
        ));

    DocumentType::new("ABONO DE DIVIDENDOS")
        .block(Block::new("ABONO DE DIVIDENDOS").recipe(with_taxes_and_fees(recipe)))
}

fn with_taxes_and_fees(recipe: Recipe) -> Recipe {
    recipe
        // RETENCION EN ORIGEN USD -1,34
        .section(tax_section(r"RETENCION EN ORIGEN (?<currency>[A-Z]{3}) -(?<amount>[.,\d]+)"))
        // RETENCION EUR 6,65 19,0000% -1,26
        .section(tax_section(r"RETENCION (?<currency>[A-Z]{3}) [.,\d]+ [.,\d]+% -(?<amount>[.,\d]+)"))
        // BOLSA (comisión fija) EUR         20,00000000               20,00
        .section(fee_section(r"BOLSA \(comisi.n fija\) (?<currency>[A-Z]{3})\s+[.,\d]+\s+(?<amount>[.,\d]+)"))
        // SUBTOTAL EN ORIGEN) EUR                8,13
        .section(fee_section(r"SUBTOTAL EN ORIGEN\) (?<currency>[A-Z]{3})\s+(?<amount>[.,\d]+)"))
        // CANALIZADOR S/importe EUR             1.100,71             0,4500%               -4,95
        .section(fee_section(
            r"CANALIZADOR S/importe (?<currency>[A-Z]{3})\s+[.,\d]+\s+[.,\d]+%\s+-(?<amount>[.,\d]+)"
        ))
        // Mínimo EUR              -12,00
        .section(fee_section(r"M.nimo (?<currency>[A-Z]{3})\s+-(?<amount>[.,\d]+)"))
        // COMISION BANCARIA Mínimo EUR -1,50
        .section(fee_section(r"COMISION BANCARIA M.nimo (?<currency>[A-Z]{3})\s+-(?<amount>[.,\d]+)"))
        // I. V. A. % S/comisión bancaria EUR 1,50 21,0000% -0,32
        .section(fee_section(
            r"I\. V\. A\. % S/comisi.n bancaria (?<currency>[A-Z]{3}) [.,\d]+ [.,\d]+% -(?<amount>[.,\d]+)"
        ))
        // COMUNICACION EUR               -2,40
        .section(fee_section(r"COMUNICACION (?<currency>[A-Z]{3})\s+-(?<amount>[.,\d]+)"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Item, ItemKind};
    use crate::pdf_import::{Document, Grammar};
    use crate::pp::{Money, Transaction, UnitType};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    pub(crate) const COMPRA01: &str = r"BANCO BILBAO VIZCAYA ARGENTARIA, S.A.
Te facilitamos el detalle de la operación COMPRA DE VALORES  que hemos liquidado en tu cuenta.
Valor ACC.INTEL CORPORATION -USD-
ISIN Valor US4581401001
Nº de valores 100
Hora ejecución 16.50.47
Fecha ejecución 20/06/2025
Cambio divisa 1,1448 USD/EUR
CONCEPTO DIVISA BASE PRECIO IMPORTE
S/títulos USD                  100         21,00000000            2.100,00
BOLSA (comisión fija) EUR         20,00000000               20,00
SUBTOTAL EN ORIGEN) EUR                8,13
ORIGEN USD            2.100,00
CONCEPTO DIVISA BASE PRECIO IMPORTE
IMPORTE TOTAL EUR            1.854,38
";

    const VENTA01: &str = r"BANCO BILBAO VIZCAYA ARGENTARIA, S.A.
Te facilitamos el detalle de la operación VENTA DE VALORES  que hemos liquidado en tu cuenta.
Valor ACC.IBERDROLA
ISIN Valor ES0144580Y14
Nº de valores 10
Hora ejecución 20.18.37
Fecha ejecución 17/06/2025
Cambio divisa 1,0000 EUR/EUR
CONCEPTO DIVISA BASE PRECIO IMPORTE
S/títulos EUR                  10         110,07100000            1.100,71
CANALIZADOR S/importe EUR             1.100,71             0,4500%               -4,95
COMISION BANCARIA
Mínimo EUR              -12,00
COMUNICACION EUR               -2,40
ORIGEN EUR            1.100,71
IMPORTE TOTAL EUR            1.081,36
";

    const FONDO01: &str = r"BANCO BILBAO VIZCAYA ARGENTARIA, S.A.
CARTA DE AVISO POR OPERACIONES DE FONDOS REEMBOLSO EN EFECTIVO
CODIGO CUENTA VALOR: NOMBRE DEL FONDO ES0113925038 NUMERO PARTICIPACIONES CAMBIO DIVISA
1865 1752 777 888511536 BBVA BOLSA IND. USA CUBIERTO FI 483,2315919 EUR/EUR
FECHA EJECUCIÓN
28-05-2025
CONCEPTO DIVISA PRECIO IMPORTE
REEMBOLSO EFECTIVO EUR 33,110418 16.000,00
";

    pub(crate) const DIVIDENDOS01: &str = r"BANCO BILBAO VIZCAYA ARGENTARIA, S.A.
ABONO DE DIVIDENDOS
CODIGO CUENTA VALOR VALOR (US8299331004) TIPO INTERÉS FECHA VENCIMIENTO CAMBIO DIVISA
0182 2229 58 0018380492 ACC.SIRIUS XM HOLDINGS INC 28/05/2025 1,1382 USD/EUR
IMPORTE EFECTIVO USD 33 0,27000000 8,91
NUMERO DE VALORES IMPORTE BRUTO UNITARIO IMPORTE NETO UNITARIO
33 0,27000000 USD 0,22950000 USD
RETENCION EN ORIGEN USD -1,34
RETENCION EUR 6,65 19,0000% -1,26
COMISION BANCARIA Mínimo EUR -1,50
I. V. A. % S/comisión bancaria EUR 1,50 21,0000% -0,32
IMPORTE TOTAL EUR 3,57
";

    fn extract(name: &str, text: &str) -> Vec<Item> {
        let grammar = Grammar::compile("bbva", &BbvaGrammar::new()).unwrap();
        let result = grammar.extract(&Document::new(name, text));
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.items
    }

    #[test]
    fn test_compra01() {
        let items = extract("Compra01.txt", COMPRA01);
        assert_eq!(items.len(), 1);

        let ItemKind::BuySell(entry) = &items[0].kind else {
            panic!("expected buy/sell, got {:?}", items[0].kind);
        };
        assert_eq!(entry.security.isin.as_deref(), Some("US4581401001"));
        assert_eq!(entry.security.name.as_deref(), Some("ACC.INTEL CORPORATION -USD-"));
        assert_eq!(entry.security.currency, "USD");

        let tx = &entry.portfolio_transaction;
        assert_eq!(tx.transaction_type, PortfolioTransactionType::Buy);
        assert_eq!(tx.date.to_string(), "2025-06-20 16:50:47");
        assert_eq!(tx.shares, 10_000_000_000);
        assert_eq!(tx.amount, Money::new(185438, "EUR"));
        assert_eq!(tx.source.as_deref(), Some("Compra01.txt"));
        assert_eq!(tx.total_fees().unwrap(), 2000 + 813);
        assert_eq!(tx.total_taxes().unwrap(), 0);

        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(182625, "EUR"));
        let forex = gross.forex.as_ref().unwrap();
        assert_eq!(forex.amount, Money::new(209069, "USD"));
        assert_eq!(forex.exchange_rate, dec!(1) / dec!(1.1448));
        assert_eq!(tx.gross_value().unwrap(), gross.amount);
    }

    #[test]
    fn test_venta01() {
        let items = extract("Venta01.txt", VENTA01);
        let ItemKind::BuySell(entry) = &items[0].kind else {
            panic!("expected buy/sell");
        };
        let tx = &entry.portfolio_transaction;
        assert_eq!(tx.transaction_type, PortfolioTransactionType::Sell);
        assert_eq!(tx.date.to_string(), "2025-06-17 20:18:37");
        assert_eq!(tx.shares, 1_000_000_000);
        assert_eq!(tx.amount, Money::new(108136, "EUR"));
        assert_eq!(tx.total_fees().unwrap(), 495 + 1200 + 240);
        assert_eq!(tx.gross_value().unwrap(), Money::new(110071, "EUR"));
        assert!(tx.unit(UnitType::GrossValue).is_none());
    }

    #[test]
    fn test_fondo01() {
        let items = extract("Fondo01.txt", FONDO01);
        let ItemKind::BuySell(entry) = &items[0].kind else {
            panic!("expected buy/sell");
        };
        assert_eq!(entry.security.name.as_deref(), Some("BBVA BOLSA IND. USA CUBIERTO FI"));
        assert_eq!(entry.security.isin.as_deref(), Some("ES0113925038"));
        let tx = &entry.portfolio_transaction;
        assert_eq!(tx.transaction_type, PortfolioTransactionType::Sell);
        assert_eq!(tx.date.to_string(), "2025-05-28 00:00:00");
        assert_eq!(tx.shares, 48_323_159_190);
        assert_eq!(tx.amount, Money::new(1_600_000, "EUR"));
    }

    #[test]
    fn test_dividendos01() {
        let items = extract("Dividendos01.txt", DIVIDENDOS01);
        let ItemKind::AccountTransaction(entry) = &items[0].kind else {
            panic!("expected dividend");
        };
        let security = entry.security.as_ref().unwrap();
        assert_eq!(security.isin.as_deref(), Some("US8299331004"));
        assert_eq!(security.name.as_deref(), Some("ACC.SIRIUS XM HOLDINGS INC"));
        assert_eq!(security.currency, "USD");

        let tx = &entry.transaction;
        assert_eq!(tx.transaction_type, AccountTransactionType::Dividends);
        assert_eq!(tx.date.to_string(), "2025-05-28 00:00:00");
        assert_eq!(tx.shares, Some(3_300_000_000));
        assert_eq!(tx.amount, Money::new(357, "EUR"));
        assert_eq!(tx.total_taxes().unwrap(), 118 + 126);
        assert_eq!(tx.total_fees().unwrap(), 150 + 32);

        let gross = tx.unit(UnitType::GrossValue).unwrap();
        assert_eq!(gross.amount, Money::new(783, "EUR"));
        assert_eq!(gross.forex.as_ref().unwrap().amount, Money::new(891, "USD"));
        assert_eq!(tx.gross_value().unwrap(), gross.amount);

        let withholding = tx.units().iter().find(|u| u.forex.is_some() && u.unit_type == UnitType::Tax).unwrap();
        assert_eq!(withholding.forex.as_ref().unwrap().amount, Money::new(134, "USD"));
    }
}

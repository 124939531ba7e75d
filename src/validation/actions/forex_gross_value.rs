use rust_decimal::Decimal;

use crate::models::{Item, ItemKind};
use crate::pp::{AccountTransactionType, Transaction, UnitType};
use crate::validation::actions::combine;
use crate::validation::types::{ImportAction, ImportContext, Status};

/// Recomputes forex amounts and the gross value of buy/sell and dividend items.
///
/// Drift beyond the tolerance is a WARNING, or an ERROR with `strict_forex`.
/// A non-positive rate is always an ERROR.
pub struct CheckForexGrossValueAction;

const NAME: &str = "CheckForexGrossValue";

impl ImportAction for CheckForexGrossValueAction {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, item: &mut Item, ctx: &ImportContext) -> Status {
        let mut findings = Vec::new();

        for (_, tx) in item.legs() {
            check_forex_units(tx, ctx, &mut findings);
        }

        if checks_gross_round_trip(item) {
            if let Some((_, tx)) = item.primary_leg() {
                check_gross_round_trip(tx, &mut findings);
            }
        }

        combine(NAME, findings)
    }
}

fn drift_status(ctx: &ImportContext, message: String) -> Status {
    if ctx.config.strict_forex {
        Status::error(NAME, message)
    } else {
        Status::warning(NAME, message)
    }
}

fn check_forex_units(tx: &dyn Transaction, ctx: &ImportContext, findings: &mut Vec<Status>) {
    for unit in tx.units() {
        let Some(forex) = &unit.forex else { continue };

        if forex.exchange_rate <= Decimal::ZERO {
            findings.push(Status::error(
                NAME,
                format!("exchange rate {} must be positive", forex.exchange_rate),
            ));
            continue;
        }

        match unit.forex_deviation() {
            Some(Ok(deviation)) if deviation > ctx.config.forex_tolerance => {
                findings.push(drift_status(
                    ctx,
                    format!(
                        "{} {} x {} does not match {}",
                        unit.unit_type.as_str(),
                        forex.amount,
                        forex.exchange_rate,
                        unit.amount
                    ),
                ));
            }
            Some(Err(e)) => findings.push(Status::error(NAME, e.to_string())),
            _ => {}
        }
    }
}

fn checks_gross_round_trip(item: &Item) -> bool {
    match &item.kind {
        ItemKind::BuySell(_) => true,
        ItemKind::AccountTransaction(e) => {
            e.transaction.transaction_type == AccountTransactionType::Dividends
        }
        _ => false,
    }
}

fn check_gross_round_trip(tx: &dyn Transaction, findings: &mut Vec<Status>) {
    let Some(stated) = tx.unit(UnitType::GrossValue) else {
        return;
    };
    // Currency mismatches are reported by CheckCurrencies
    let Ok(derived) = tx.gross_value() else {
        return;
    };
    if stated.amount != derived {
        findings.push(Status::warning(
            NAME,
            format!(
                "gross value {} differs from {} derived from amount, fees and taxes",
                stated.amount, derived
            ),
        ));
    }
}

//! Duplicate fingerprint index.
//!
//! Snapshot of the ledger's transactions keyed by a coarse fingerprint. Built
//! once per batch; lookups never mutate it.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::LegKind;
use crate::pp::transaction::Transaction;
use crate::pp::Client;

/// Coarse identity of a transaction leg
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub security_uuid: Option<String>,
    pub date: NaiveDate,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub type_str: &'static str,
    pub leg: LegKind,
}

impl Fingerprint {
    pub fn of(leg: LegKind, tx: &dyn Transaction) -> Self {
        Self {
            security_uuid: tx.security_uuid().map(str::to_string),
            date: tx.date().date(),
            amount: tx.amount().amount,
            currency: tx.amount().currency.clone(),
            type_str: tx.type_str(),
            leg,
        }
    }
}

/// Fingerprints of existing ledger transactions with the source each came from
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    entries: HashMap<Fingerprint, Vec<Option<String>>>,
}

impl FingerprintIndex {
    pub fn build(client: &Client) -> Self {
        let mut index = Self::default();
        for account in &client.accounts {
            for tx in &account.transactions {
                index.add(Fingerprint::of(LegKind::Account, tx), tx.source.clone());
            }
        }
        for portfolio in &client.portfolios {
            for tx in &portfolio.transactions {
                index.add(Fingerprint::of(LegKind::Portfolio, tx), tx.source.clone());
            }
        }
        log::debug!("Fingerprint index built with {} keys", index.entries.len());
        index
    }

    fn add(&mut self, fingerprint: Fingerprint, source: Option<String>) {
        self.entries.entry(fingerprint).or_default().push(source);
    }

    /// Sources of the ledger transactions sharing this fingerprint
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&[Option<String>]> {
        self.entries.get(fingerprint).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pp::{Account, AccountTransaction, AccountTransactionType, Money};

    #[test]
    fn test_index_lookup() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(10, 15, 0).unwrap();
        let mut tx = AccountTransaction::new("t".into(), date, AccountTransactionType::Fees, Money::new(1500, "CHF"));
        tx.source = Some("Jahresgebuehr.txt".into());

        let mut account = Account::new("a".into(), "Konto".into(), "CHF".into());
        account.transactions.push(tx.clone());
        let mut client = Client::new("CHF");
        client.accounts.push(account);

        let index = FingerprintIndex::build(&client);
        assert_eq!(index.len(), 1);

        // Time of day is ignored
        let mut lookup_tx = tx.clone();
        lookup_tx.date = date.date().and_hms_opt(0, 0, 0).unwrap();
        let sources = index.lookup(&Fingerprint::of(LegKind::Account, &lookup_tx)).unwrap();
        assert_eq!(sources, &[Some("Jahresgebuehr.txt".to_string())]);

        lookup_tx.amount = Money::new(1501, "CHF");
        assert!(index.lookup(&Fingerprint::of(LegKind::Account, &lookup_tx)).is_none());
        assert!(index.lookup(&Fingerprint::of(LegKind::Portfolio, &tx)).is_none());
    }
}

//! Transaction types for Portfolio Performance.
//!
//! Transactions can belong to either accounts (AccountTransaction) or
//! portfolios (PortfolioTransaction). They share common fields but have
//! different transaction types. The shared behaviour (units, gross value)
//! lives in the [`Transaction`] trait.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::common::{ForexInfo, Money};
use crate::error::MoneyError;

/// Unit type for transaction components (fees, taxes, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    /// Broker/transaction fee
    Fee,
    /// Tax amount
    Tax,
    /// Gross transaction value (before fees/taxes)
    GrossValue,
}

impl UnitType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FEE" => Some(Self::Fee),
            "TAX" => Some(Self::Tax),
            "GROSS_VALUE" => Some(Self::GrossValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fee => "FEE",
            Self::Tax => "TAX",
            Self::GrossValue => "GROSS_VALUE",
        }
    }
}

/// A single unit (component) of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUnit {
    pub unit_type: UnitType,
    pub amount: Money,
    /// Forex information if the unit was stated in a different currency
    pub forex: Option<ForexInfo>,
}

impl TransactionUnit {
    pub fn new(unit_type: UnitType, amount: Money) -> Self {
        Self {
            unit_type,
            amount,
            forex: None,
        }
    }

    pub fn with_forex(mut self, forex: ForexInfo) -> Self {
        self.forex = Some(forex);
        self
    }

    /// Create a fee unit
    pub fn fee(amount: Money) -> Self {
        Self::new(UnitType::Fee, amount)
    }

    /// Create a tax unit
    pub fn tax(amount: Money) -> Self {
        Self::new(UnitType::Tax, amount)
    }

    /// Create a gross value unit
    pub fn gross_value(amount: Money) -> Self {
        Self::new(UnitType::GrossValue, amount)
    }

    /// Distance in minor units between the unit amount and the converted
    /// forex amount. `None` without forex information.
    pub fn forex_deviation(&self) -> Option<Result<i64, MoneyError>> {
        let forex = self.forex.as_ref()?;
        Some(
            forex
                .converted(&self.amount.currency)
                .and_then(|converted| {
                    converted
                        .amount
                        .checked_sub(self.amount.amount)
                        .and_then(i64::checked_abs)
                        .ok_or(MoneyError::Overflow)
                }),
        )
    }

    /// Forex amount times rate lands within `tolerance` minor units of the amount
    pub fn is_forex_consistent(&self, tolerance: i64) -> bool {
        match self.forex_deviation() {
            None => true,
            Some(Ok(deviation)) => deviation <= tolerance,
            Some(Err(_)) => false,
        }
    }
}

/// Cross-entry type for linked transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossEntryType {
    /// Transfer between portfolios
    PortfolioTransfer,
    /// Transfer between accounts
    AccountTransfer,
    /// Buy/sell pair (portfolio transaction + account transaction)
    BuySell,
}

/// Cross-entry linking two related transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossEntry {
    pub entry_type: CrossEntryType,
    /// UUID of the source transaction
    pub source_uuid: String,
    /// UUID of the target transaction
    pub target_uuid: String,
}

impl CrossEntry {
    pub fn portfolio_transfer(source_uuid: String, target_uuid: String) -> Self {
        Self {
            entry_type: CrossEntryType::PortfolioTransfer,
            source_uuid,
            target_uuid,
        }
    }

    pub fn account_transfer(source_uuid: String, target_uuid: String) -> Self {
        Self {
            entry_type: CrossEntryType::AccountTransfer,
            source_uuid,
            target_uuid,
        }
    }

    pub fn buy_sell(source_uuid: String, target_uuid: String) -> Self {
        Self {
            entry_type: CrossEntryType::BuySell,
            source_uuid,
            target_uuid,
        }
    }
}

/// Account transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTransactionType {
    /// Cash deposit
    Deposit,
    /// Cash withdrawal
    Removal,
    /// Interest income
    Interest,
    /// Interest charge (negative)
    InterestCharge,
    /// Dividend payment
    Dividends,
    /// Fee charge
    Fees,
    /// Fee refund
    FeesRefund,
    /// Tax charge
    Taxes,
    /// Tax refund
    TaxRefund,
    /// Buy (debit when paying from cash)
    Buy,
    /// Sell (credit when receiving cash)
    Sell,
    /// Transfer in from another account
    TransferIn,
    /// Transfer out to another account
    TransferOut,
}

impl AccountTransactionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(Self::Deposit),
            "REMOVAL" => Some(Self::Removal),
            "INTEREST" => Some(Self::Interest),
            "INTEREST_CHARGE" => Some(Self::InterestCharge),
            "DIVIDENDS" => Some(Self::Dividends),
            "FEES" => Some(Self::Fees),
            "FEES_REFUND" => Some(Self::FeesRefund),
            "TAXES" => Some(Self::Taxes),
            "TAX_REFUND" => Some(Self::TaxRefund),
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            "TRANSFER_IN" => Some(Self::TransferIn),
            "TRANSFER_OUT" => Some(Self::TransferOut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Removal => "REMOVAL",
            Self::Interest => "INTEREST",
            Self::InterestCharge => "INTEREST_CHARGE",
            Self::Dividends => "DIVIDENDS",
            Self::Fees => "FEES",
            Self::FeesRefund => "FEES_REFUND",
            Self::Taxes => "TAXES",
            Self::TaxRefund => "TAX_REFUND",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::TransferIn => "TRANSFER_IN",
            Self::TransferOut => "TRANSFER_OUT",
        }
    }

    /// Is this a credit (money coming in)?
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            Self::Deposit
                | Self::Interest
                | Self::Dividends
                | Self::FeesRefund
                | Self::TaxRefund
                | Self::Sell
                | Self::TransferIn
        )
    }
}

/// Portfolio transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortfolioTransactionType {
    /// Purchase of securities
    Buy,
    /// Sale of securities
    Sell,
    /// Transfer in from another portfolio
    TransferIn,
    /// Transfer out to another portfolio
    TransferOut,
    /// Delivery inbound (non-cash inflow)
    DeliveryInbound,
    /// Delivery outbound (non-cash outflow)
    DeliveryOutbound,
}

impl PortfolioTransactionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            "TRANSFER_IN" => Some(Self::TransferIn),
            "TRANSFER_OUT" => Some(Self::TransferOut),
            "DELIVERY_INBOUND" => Some(Self::DeliveryInbound),
            "DELIVERY_OUTBOUND" => Some(Self::DeliveryOutbound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::TransferIn => "TRANSFER_IN",
            Self::TransferOut => "TRANSFER_OUT",
            Self::DeliveryInbound => "DELIVERY_INBOUND",
            Self::DeliveryOutbound => "DELIVERY_OUTBOUND",
        }
    }

    /// Is this a purchase (shares coming in)?
    pub fn is_purchase(&self) -> bool {
        matches!(self, Self::Buy | Self::TransferIn | Self::DeliveryInbound)
    }

    /// Account-side counterpart of a buy/sell
    pub fn account_type(&self) -> AccountTransactionType {
        if self.is_purchase() {
            AccountTransactionType::Buy
        } else {
            AccountTransactionType::Sell
        }
    }
}

/// Behaviour shared by account and portfolio transactions
pub trait Transaction {
    fn date(&self) -> NaiveDateTime;
    fn amount(&self) -> &Money;
    fn units(&self) -> &[TransactionUnit];
    fn units_mut(&mut self) -> &mut Vec<TransactionUnit>;
    fn security_uuid(&self) -> Option<&str>;
    fn set_security_uuid(&mut self, uuid: Option<String>);
    fn set_source(&mut self, source: &str);
    fn type_str(&self) -> &'static str;

    /// Fees and taxes were deducted from the gross value to get the amount
    /// (sales, dividends). Otherwise they were added (purchases, charges).
    fn deducts_costs(&self) -> bool;

    fn currency(&self) -> &str {
        &self.amount().currency
    }

    fn unit(&self, unit_type: UnitType) -> Option<&TransactionUnit> {
        self.units().iter().find(|u| u.unit_type == unit_type)
    }

    fn add_unit(&mut self, unit: TransactionUnit) {
        self.units_mut().push(unit);
    }

    fn remove_units(&mut self, unit_type: UnitType) {
        self.units_mut().retain(|u| u.unit_type != unit_type);
    }

    /// Sum of all fee and tax units in transaction currency
    fn fees_and_taxes(&self) -> Result<Money, MoneyError> {
        self.units()
            .iter()
            .filter(|u| u.unit_type != UnitType::GrossValue)
            .try_fold(Money::zero(self.currency()), |acc, u| acc.add(&u.amount))
    }

    /// Gross value derived from amount, fees and taxes
    fn gross_value(&self) -> Result<Money, MoneyError> {
        let costs = self.fees_and_taxes()?;
        if self.deducts_costs() {
            self.amount().add(&costs)
        } else {
            self.amount().subtract(&costs)
        }
    }
}

fn sum_units(units: &[TransactionUnit], unit_type: UnitType) -> Result<i64, MoneyError> {
    units
        .iter()
        .filter(|u| u.unit_type == unit_type)
        .try_fold(0i64, |acc, u| acc.checked_add(u.amount.amount).ok_or(MoneyError::Overflow))
}

/// Account transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransaction {
    pub uuid: String,
    pub date: NaiveDateTime,
    pub transaction_type: AccountTransactionType,
    pub amount: Money,
    /// Number of shares (for dividends) - stored as shares * 10^8
    pub shares: Option<i64>,
    /// Reference to security (for dividends, interest from securities)
    pub security_uuid: Option<String>,
    /// Transaction units (fees, taxes, forex)
    pub units: Vec<TransactionUnit>,
    /// Cross-entry for linked transactions
    pub cross_entry: Option<CrossEntry>,
    /// User note
    pub note: Option<String>,
    /// Source document reference
    pub source: Option<String>,
}

impl AccountTransaction {
    pub fn new(
        uuid: String,
        date: NaiveDateTime,
        transaction_type: AccountTransactionType,
        amount: Money,
    ) -> Self {
        Self {
            uuid,
            date,
            transaction_type,
            amount,
            shares: None,
            security_uuid: None,
            units: Vec::new(),
            cross_entry: None,
            note: None,
            source: None,
        }
    }

    /// Calculate total fees from units
    pub fn total_fees(&self) -> Result<i64, MoneyError> {
        sum_units(&self.units, UnitType::Fee)
    }

    /// Calculate total taxes from units
    pub fn total_taxes(&self) -> Result<i64, MoneyError> {
        sum_units(&self.units, UnitType::Tax)
    }
}

impl Transaction for AccountTransaction {
    fn date(&self) -> NaiveDateTime {
        self.date
    }

    fn amount(&self) -> &Money {
        &self.amount
    }

    fn units(&self) -> &[TransactionUnit] {
        &self.units
    }

    fn units_mut(&mut self) -> &mut Vec<TransactionUnit> {
        &mut self.units
    }

    fn security_uuid(&self) -> Option<&str> {
        self.security_uuid.as_deref()
    }

    fn set_security_uuid(&mut self, uuid: Option<String>) {
        self.security_uuid = uuid;
    }

    fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
    }

    fn type_str(&self) -> &'static str {
        self.transaction_type.as_str()
    }

    fn deducts_costs(&self) -> bool {
        self.transaction_type.is_credit()
    }
}

/// Portfolio transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTransaction {
    pub uuid: String,
    pub date: NaiveDateTime,
    pub transaction_type: PortfolioTransactionType,
    pub amount: Money,
    /// Number of shares - stored as shares * 10^8
    pub shares: i64,
    /// Reference to security
    pub security_uuid: Option<String>,
    /// Transaction units (fees, taxes, forex)
    pub units: Vec<TransactionUnit>,
    /// Cross-entry for linked transactions
    pub cross_entry: Option<CrossEntry>,
    /// User note
    pub note: Option<String>,
    /// Source document reference
    pub source: Option<String>,
}

impl PortfolioTransaction {
    pub fn new(
        uuid: String,
        date: NaiveDateTime,
        transaction_type: PortfolioTransactionType,
        amount: Money,
        shares: i64,
    ) -> Self {
        Self {
            uuid,
            date,
            transaction_type,
            amount,
            shares,
            security_uuid: None,
            units: Vec::new(),
            cross_entry: None,
            note: None,
            source: None,
        }
    }

    /// Calculate total fees from units
    pub fn total_fees(&self) -> Result<i64, MoneyError> {
        sum_units(&self.units, UnitType::Fee)
    }

    /// Calculate total taxes from units
    pub fn total_taxes(&self) -> Result<i64, MoneyError> {
        sum_units(&self.units, UnitType::Tax)
    }
}

impl Transaction for PortfolioTransaction {
    fn date(&self) -> NaiveDateTime {
        self.date
    }

    fn amount(&self) -> &Money {
        &self.amount
    }

    fn units(&self) -> &[TransactionUnit] {
        &self.units
    }

    fn units_mut(&mut self) -> &mut Vec<TransactionUnit> {
        &mut self.units
    }

    fn security_uuid(&self) -> Option<&str> {
        self.security_uuid.as_deref()
    }

    fn set_security_uuid(&mut self, uuid: Option<String>) {
        self.security_uuid = uuid;
    }

    fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
    }

    fn type_str(&self) -> &'static str {
        self.transaction_type.as_str()
    }

    fn deducts_costs(&self) -> bool {
        !self.transaction_type.is_purchase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy(amount: i64) -> PortfolioTransaction {
        PortfolioTransaction::new(
            "test".to_string(),
            NaiveDateTime::default(),
            PortfolioTransactionType::Buy,
            Money::new(amount, "EUR"),
            100_000_000,
        )
    }

    #[test]
    fn test_unit_type_parsing() {
        assert_eq!(UnitType::from_str("FEE"), Some(UnitType::Fee));
        assert_eq!(UnitType::from_str("TAX"), Some(UnitType::Tax));
        assert_eq!(UnitType::from_str("GROSS_VALUE"), Some(UnitType::GrossValue));
        assert_eq!(UnitType::from_str("UNKNOWN"), None);
    }

    #[test]
    fn test_portfolio_transaction_type_serialization() {
        let types = vec![
            (PortfolioTransactionType::Buy, "\"BUY\""),
            (PortfolioTransactionType::Sell, "\"SELL\""),
            (PortfolioTransactionType::DeliveryInbound, "\"DELIVERY_INBOUND\""),
            (PortfolioTransactionType::TransferOut, "\"TRANSFER_OUT\""),
        ];

        for (tx_type, expected) in types {
            let json = serde_json::to_string(&tx_type).unwrap();
            assert_eq!(json, expected, "Serialization of {:?} failed", tx_type);
        }
    }

    #[test]
    fn test_account_transaction_type_parsing() {
        assert_eq!(
            AccountTransactionType::from_str("DIVIDENDS"),
            Some(AccountTransactionType::Dividends)
        );
        assert!(AccountTransactionType::Deposit.is_credit());
        assert!(!AccountTransactionType::Removal.is_credit());
        assert_eq!(
            PortfolioTransactionType::Sell.account_type(),
            AccountTransactionType::Sell
        );
    }

    #[test]
    fn test_transaction_fee_calculation() {
        let mut tx = buy(10000);
        tx.add_unit(TransactionUnit::fee(Money::new(1000, "EUR")));
        tx.add_unit(TransactionUnit::fee(Money::new(500, "EUR")));
        tx.add_unit(TransactionUnit::tax(Money::new(200, "EUR")));

        assert_eq!(tx.total_fees().unwrap(), 1500);
        assert_eq!(tx.total_taxes().unwrap(), 200);
        assert_eq!(tx.fees_and_taxes().unwrap().amount, 1700);
    }

    #[test]
    fn test_gross_value_purchase_and_dividend() {
        let mut tx = buy(185438);
        tx.add_unit(TransactionUnit::fee(Money::new(2000, "EUR")));
        tx.add_unit(TransactionUnit::fee(Money::new(813, "EUR")));
        assert_eq!(tx.gross_value().unwrap(), Money::new(182625, "EUR"));

        let mut dividend = AccountTransaction::new(
            "d".into(),
            NaiveDateTime::default(),
            AccountTransactionType::Dividends,
            Money::new(357, "EUR"),
        );
        dividend.add_unit(TransactionUnit::tax(Money::new(244, "EUR")));
        dividend.add_unit(TransactionUnit::fee(Money::new(182, "EUR")));
        assert_eq!(dividend.gross_value().unwrap(), Money::new(783, "EUR"));
    }

    #[test]
    fn test_gross_value_rejects_foreign_fee() {
        let mut tx = buy(10000);
        tx.add_unit(TransactionUnit::fee(Money::new(100, "USD")));
        assert!(tx.gross_value().is_err());
    }

    #[test]
    fn test_forex_consistency() {
        let unit = TransactionUnit::gross_value(Money::new(182625, "EUR")).with_forex(ForexInfo::new(
            Money::new(209069, "USD"),
            dec!(1) / dec!(1.1448),
        ));
        assert!(unit.is_forex_consistent(1));
        assert_eq!(unit.forex_deviation().unwrap().unwrap(), 0);

        let off = TransactionUnit::gross_value(Money::new(182625, "EUR")).with_forex(ForexInfo::new(
            Money::new(210000, "USD"),
            dec!(1) / dec!(1.1448),
        ));
        assert!(!off.is_forex_consistent(1));
        assert!(TransactionUnit::fee(Money::new(1, "EUR")).is_forex_consistent(0));
    }

    #[test]
    fn test_unit_sums_overflow() {
        let mut tx = buy(10000);
        tx.add_unit(TransactionUnit::fee(Money::new(i64::MAX, "EUR")));
        tx.add_unit(TransactionUnit::fee(Money::new(1, "EUR")));
        assert!(matches!(tx.total_fees(), Err(MoneyError::Overflow)));
        assert_eq!(tx.total_taxes().unwrap(), 0);

        let unit = TransactionUnit::gross_value(Money::new(i64::MIN, "EUR"))
            .with_forex(ForexInfo::new(Money::new(100, "USD"), dec!(1)));
        assert!(matches!(unit.forex_deviation(), Some(Err(MoneyError::Overflow))));
        assert!(!unit.is_forex_consistent(1));
    }

    #[test]
    fn test_remove_units() {
        let mut tx = buy(10000);
        tx.add_unit(TransactionUnit::gross_value(Money::new(10000, "EUR")));
        tx.add_unit(TransactionUnit::fee(Money::new(100, "EUR")));
        tx.remove_units(UnitType::GrossValue);
        assert!(tx.unit(UnitType::GrossValue).is_none());
        assert_eq!(tx.units.len(), 1);
    }
}

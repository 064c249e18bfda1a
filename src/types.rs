use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::LedgerError;

/// unique identifier for a credit account
pub type AccountId = Uuid;

/// unique identifier for a ledger transaction
pub type TransactionId = Uuid;

/// unique identifier for an installment
pub type InstallmentId = Uuid;

/// client owning a credit account
pub type ClientId = Uuid;

/// establishment extending the credit
pub type EstablishmentId = Uuid;

/// how the annual rate is turned into a periodic charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestType {
    /// simple proportional rate
    Nominal,
    /// compounding rate
    Effective,
}

/// revolving vs installment credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditType {
    /// revolving, interest accrues monthly on the balance
    ShortTerm,
    /// each purchase is amortized into installments
    LongTerm,
}

/// account lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Closed,
}

/// ledger entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Payment,
    InterestAccrual,
    LateFee,
    /// compensating debit for a failed payment
    Reversal,
}

impl TransactionType {
    /// direction of the entry against the balance owed
    pub fn sign(&self) -> i8 {
        match self {
            TransactionType::Payment => -1,
            TransactionType::Purchase
            | TransactionType::InterestAccrual
            | TransactionType::LateFee
            | TransactionType::Reversal => 1,
        }
    }

    /// amount with the sign applied
    pub fn signed(&self, amount: Money) -> Money {
        if self.sign() < 0 {
            -amount
        } else {
            amount
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Yape,
    Plin,
}

impl PaymentMethod {
    /// cash needs no confirmation round-trip
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl fmt::Display for InterestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestType::Nominal => write!(f, "NOMINAL"),
            InterestType::Effective => write!(f, "EFFECTIVE"),
        }
    }
}

impl FromStr for InterestType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOMINAL" => Ok(InterestType::Nominal),
            "EFFECTIVE" => Ok(InterestType::Effective),
            _ => Err(LedgerError::InvalidInterestType {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditType::ShortTerm => write!(f, "SHORT_TERM"),
            CreditType::LongTerm => write!(f, "LONG_TERM"),
        }
    }
}

impl FromStr for CreditType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHORT_TERM" => Ok(CreditType::ShortTerm),
            "LONG_TERM" => Ok(CreditType::LongTerm),
            _ => Err(LedgerError::InvalidCreditType {
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "YAPE" => Ok(PaymentMethod::Yape),
            "PLIN" => Ok(PaymentMethod::Plin),
            _ => Err(LedgerError::validation(format!("invalid payment method: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credit_type() {
        assert_eq!("SHORT_TERM".parse::<CreditType>().unwrap(), CreditType::ShortTerm);
        assert_eq!("long_term".parse::<CreditType>().unwrap(), CreditType::LongTerm);

        let err = "MEDIUM_TERM".parse::<CreditType>().unwrap_err();
        assert_eq!(err, LedgerError::InvalidCreditType { value: "MEDIUM_TERM".to_string() });
    }

    #[test]
    fn test_parse_interest_type() {
        assert_eq!("EFFECTIVE".parse::<InterestType>().unwrap(), InterestType::Effective);
        assert!(matches!(
            "COMPOUND".parse::<InterestType>(),
            Err(LedgerError::InvalidInterestType { .. })
        ));
    }

    #[test]
    fn test_transaction_signs() {
        let amount = Money::from_major(10);
        assert_eq!(TransactionType::Payment.signed(amount), Money::from_major(-10));
        assert_eq!(TransactionType::Purchase.signed(amount), amount);
        assert_eq!(TransactionType::LateFee.signed(amount), amount);
        assert_eq!(TransactionType::Reversal.signed(amount), amount);
    }

    #[test]
    fn test_serde_names_match_wire_format() {
        let json = serde_json::to_string(&CreditType::LongTerm).unwrap();
        assert_eq!(json, "\"LONG_TERM\"");
        let parsed: TransactionType = serde_json::from_str("\"INTEREST_ACCRUAL\"").unwrap();
        assert_eq!(parsed, TransactionType::InterestAccrual);
    }

    #[test]
    fn test_cash_needs_no_confirmation() {
        assert!(!PaymentMethod::Cash.requires_confirmation());
        assert!(PaymentMethod::Yape.requires_confirmation());
        assert!("plin".parse::<PaymentMethod>().is_ok());
    }
}

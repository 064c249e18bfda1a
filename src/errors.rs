use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("invalid credit type: {value}")]
    InvalidCreditType {
        value: String,
    },

    #[error("invalid interest type: {value}")]
    InvalidInterestType {
        value: String,
    },

    #[error("credit account {id} is blocked")]
    AccountBlocked {
        id: Uuid,
    },

    #[error("credit account {id} is closed")]
    AccountClosed {
        id: Uuid,
    },

    #[error("credit limit exceeded: limit {limit}, balance {balance}, requested {requested}")]
    CreditLimitExceeded {
        limit: Money,
        balance: Money,
        requested: Money,
    },

    #[error("payment exceeds balance: balance {balance}, requested {requested}")]
    PaymentExceedsBalance {
        balance: Money,
        requested: Money,
    },

    #[error("overdue balance {overdue} blocks new purchases")]
    OverdueBalanceBlocksPurchase {
        overdue: Money,
    },

    #[error("no late fee rule covers {days_overdue} days overdue")]
    NoApplicableLateFeeRule {
        days_overdue: u32,
    },

    #[error("credit account not found: {id}")]
    AccountNotFound {
        id: Uuid,
    },

    #[error("transaction not found: {id}")]
    TransactionNotFound {
        id: Uuid,
    },

    #[error("client {client_id} already has an active account at establishment {establishment_id}")]
    DuplicateAccount {
        client_id: Uuid,
        establishment_id: Uuid,
    },

    #[error("account balance must be zero, current balance is {balance}")]
    NonZeroBalance {
        balance: Money,
    },

    #[error("transaction {id} cannot be confirmed")]
    PaymentNotConfirmable {
        id: Uuid,
    },

    #[error("invalid confirmation code for transaction {id}")]
    InvalidConfirmationCode {
        id: Uuid,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        LedgerError::Calculation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }

    /// whether the caller may retry the same request later
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

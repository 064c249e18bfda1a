use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{AccountId, PaymentMethod, PaymentStatus, TransactionId, TransactionType};

/// immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionType,
    /// always positive, direction comes from `kind`
    pub amount: Money,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub payment_code: Option<String>,
    pub confirmation_code: Option<String>,
    /// entry this one compensates
    pub reverses: Option<TransactionId>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        kind: TransactionType,
        amount: Money,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            description: description.into(),
            timestamp,
            payment_method: None,
            payment_status: PaymentStatus::Success,
            payment_code: None,
            confirmation_code: None,
            reverses: None,
        }
    }

    /// payment entry, pending with a code unless paid in cash
    pub fn payment(
        account_id: AccountId,
        amount: Money,
        description: impl Into<String>,
        method: PaymentMethod,
        payment_code: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self::new(account_id, TransactionType::Payment, amount, description, timestamp);
        tx.payment_method = Some(method);
        if method.requires_confirmation() {
            tx.payment_status = PaymentStatus::Pending;
            tx.payment_code = payment_code;
        }
        tx
    }

    /// compensating debit for a failed payment
    pub fn reversal_of(payment: &Transaction, timestamp: DateTime<Utc>) -> Self {
        let mut tx = Self::new(
            payment.account_id,
            TransactionType::Reversal,
            payment.amount,
            format!("reversal of failed payment {}", payment.id),
            timestamp,
        );
        tx.reverses = Some(payment.id);
        tx
    }

    /// amount signed against the balance owed
    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }

    pub fn is_pending_payment(&self) -> bool {
        self.kind == TransactionType::Payment && self.payment_status == PaymentStatus::Pending
    }
}

/// balance implied by a sequence of entries
pub fn net_balance<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Money {
    transactions.into_iter().map(|tx| tx.signed_amount()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_payment_is_settled() {
        let tx = Transaction::payment(
            Uuid::new_v4(),
            Money::from_major(50),
            "cash",
            PaymentMethod::Cash,
            Some("123456".to_string()),
            Utc::now(),
        );
        assert_eq!(tx.payment_status, PaymentStatus::Success);
        assert_eq!(tx.payment_code, None);
        assert!(!tx.is_pending_payment());
    }

    #[test]
    fn test_wallet_payment_is_pending() {
        let tx = Transaction::payment(
            Uuid::new_v4(),
            Money::from_major(50),
            "yape",
            PaymentMethod::Yape,
            Some("654321".to_string()),
            Utc::now(),
        );
        assert!(tx.is_pending_payment());
        assert_eq!(tx.payment_code.as_deref(), Some("654321"));
    }

    #[test]
    fn test_net_balance() {
        let account = Uuid::new_v4();
        let now = Utc::now();
        let purchase = Transaction::new(account, TransactionType::Purchase, Money::from_major(100), "tv", now);
        let payment = Transaction::payment(account, Money::from_major(40), "", PaymentMethod::Plin, None, now);
        let reversal = Transaction::reversal_of(&payment, now);

        assert_eq!(reversal.reverses, Some(payment.id));
        assert_eq!(net_balance(&[purchase.clone(), payment.clone()]), Money::from_major(60));
        assert_eq!(net_balance(&[purchase, payment, reversal]), Money::from_major(100));
    }
}

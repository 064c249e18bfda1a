use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{AccountId, InstallmentId, InstallmentStatus, TransactionId};

/// scheduled repayment slice of a long-term purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub account_id: AccountId,
    pub purchase_id: TransactionId,
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub amount_paid: Money,
    pub status: InstallmentStatus,
}

impl Installment {
    pub fn new(
        account_id: AccountId,
        purchase_id: TransactionId,
        sequence: u32,
        due_date: NaiveDate,
        amount: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            purchase_id,
            sequence,
            due_date,
            amount,
            amount_paid: Money::ZERO,
            status: InstallmentStatus::Pending,
        }
    }

    /// amount still owed on this installment
    pub fn unpaid(&self) -> Money {
        (self.amount - self.amount_paid).max(Money::ZERO)
    }

    pub fn is_open(&self) -> bool {
        self.status != InstallmentStatus::Paid
    }

    /// past due and unpaid as of `today`
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }

    /// pending installment whose due date has passed becomes overdue
    pub fn mark_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == InstallmentStatus::Pending && self.due_date < today {
            self.status = InstallmentStatus::Overdue;
            return true;
        }
        false
    }

    /// close an open installment once the account owes nothing, returns whether it changed
    ///
    /// scheduled interest that never accrued onto the balance is not collected
    pub fn settle(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = InstallmentStatus::Paid;
        true
    }

    /// apply up to `amount`, returning what was not needed
    pub fn apply(&mut self, amount: Money) -> Money {
        let applied = amount.min(self.unpaid());
        self.amount_paid += applied;
        if self.unpaid().is_zero() {
            self.status = InstallmentStatus::Paid;
        }
        amount - applied
    }
}

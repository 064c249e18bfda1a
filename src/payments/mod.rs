pub mod allocation;
pub mod amortization;
pub mod due_date;
pub mod overdue;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AccountId, PaymentMethod};

pub use allocation::{AllocationResult, InstallmentAllocator, InstallmentApplication};
pub use amortization::{calculate_installment_amount, InstallmentPlan, InstallmentScheduler, ScheduledPayment};
pub use due_date::DueDateResolver;
pub use overdue::overdue_balance;

/// payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub account_id: AccountId,
    pub amount: Money,
    pub description: String,
    pub method: PaymentMethod,
}

impl PaymentRequest {
    pub fn new(account_id: AccountId, amount: Money, description: impl Into<String>, method: PaymentMethod) -> Self {
        Self {
            account_id,
            amount,
            description: description.into(),
            method,
        }
    }

    pub fn cash(account_id: AccountId, amount: Money, description: impl Into<String>) -> Self {
        Self::new(account_id, amount, description, PaymentMethod::Cash)
    }

    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)
    }
}

/// posted amounts must be strictly positive
pub fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(format!("amount must be positive, got {}", amount)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_payment_request_validation() {
        let account = Uuid::new_v4();
        assert!(PaymentRequest::cash(account, Money::from_major(10), "").validate().is_ok());
        assert!(PaymentRequest::cash(account, Money::ZERO, "").validate().is_err());
        assert!(PaymentRequest::new(account, Money::from_major(-5), "", PaymentMethod::Yape)
            .validate()
            .is_err());
    }
}

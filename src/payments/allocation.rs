use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::installment::Installment;
use crate::types::{InstallmentId, InstallmentStatus};

/// how much of a payment went to one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentApplication {
    pub installment_id: InstallmentId,
    pub applied: Money,
    pub settled: bool,
}

/// result of spreading a payment over installments
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationResult {
    pub applications: Vec<InstallmentApplication>,
    /// part of the payment not matched to any installment
    pub unallocated: Money,
}

impl AllocationResult {
    pub fn allocated(&self) -> Money {
        self.applications.iter().map(|a| a.applied).sum()
    }
}

/// applies payments to open installments, oldest due date first
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallmentAllocator;

impl InstallmentAllocator {
    pub fn new() -> Self {
        Self
    }

    /// mutates the installments in place, returns what changed
    pub fn allocate(&self, amount: Money, installments: &mut [Installment]) -> AllocationResult {
        let mut order: Vec<usize> = (0..installments.len())
            .filter(|&idx| installments[idx].status != InstallmentStatus::Paid)
            .collect();
        order.sort_by_key(|&idx| (installments[idx].due_date, installments[idx].sequence));

        let mut remaining = amount;
        let mut applications = Vec::new();

        for idx in order {
            if !remaining.is_positive() {
                break;
            }
            let inst = &mut installments[idx];
            let before = remaining;
            remaining = inst.apply(remaining);

            applications.push(InstallmentApplication {
                installment_id: inst.id,
                applied: before - remaining,
                settled: inst.status == InstallmentStatus::Paid,
            });
        }

        AllocationResult {
            applications,
            unallocated: remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn installments() -> Vec<Installment> {
        let account = Uuid::new_v4();
        let purchase = Uuid::new_v4();
        vec![
            Installment::new(account, purchase, 2, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), Money::from_major(100)),
            Installment::new(account, purchase, 1, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(), Money::from_major(100)),
            Installment::new(account, purchase, 3, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(), Money::from_major(100)),
        ]
    }

    #[test]
    fn test_oldest_first() {
        let allocator = InstallmentAllocator::new();
        let mut insts = installments();

        let result = allocator.allocate(Money::from_major(150), &mut insts);

        assert_eq!(result.applications.len(), 2);
        assert_eq!(result.allocated(), Money::from_major(150));
        assert_eq!(result.unallocated, Money::ZERO);

        // sequence 1 (february) settled first
        assert_eq!(insts[1].status, InstallmentStatus::Paid);
        assert_eq!(insts[0].status, InstallmentStatus::Pending);
        assert_eq!(insts[0].unpaid(), Money::from_major(50));
        assert_eq!(insts[2].unpaid(), Money::from_major(100));
    }

    #[test]
    fn test_overdue_installments_are_paid_too() {
        let allocator = InstallmentAllocator::new();
        let mut insts = installments();
        insts[1].status = InstallmentStatus::Overdue;

        allocator.allocate(Money::from_major(100), &mut insts);
        assert_eq!(insts[1].status, InstallmentStatus::Paid);
    }

    #[test]
    fn test_excess_is_unallocated() {
        let allocator = InstallmentAllocator::new();
        let mut insts = installments();

        let result = allocator.allocate(Money::from_major(350), &mut insts);
        assert!(insts.iter().all(|i| i.status == InstallmentStatus::Paid));
        assert_eq!(result.unallocated, Money::from_major(50));
    }
}

use chrono::NaiveDate;

use crate::account::CreditAccount;
use crate::dates;
use crate::installment::Installment;
use crate::types::{CreditType, InstallmentStatus};

/// resolves the next date a payment is expected on
#[derive(Debug, Clone, Copy, Default)]
pub struct DueDateResolver;

impl DueDateResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn next_due_date(&self, account: &CreditAccount, installments: &[Installment], today: NaiveDate) -> NaiveDate {
        match account.credit_type {
            CreditType::ShortTerm => dates::next_monthly_due_date(today, account.monthly_due_day),
            CreditType::LongTerm => installments
                .iter()
                .filter(|i| i.status == InstallmentStatus::Pending && i.due_date > today)
                .map(|i| i.due_date)
                .min()
                .unwrap_or_else(|| dates::next_monthly_due_date(today, account.monthly_due_day)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountTerms;
    use crate::decimal::{Money, Rate};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(credit_type: CreditType) -> CreditAccount {
        let mut terms = AccountTerms::revolving(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1_000),
            15,
            Rate::from_percentage(12),
        );
        terms.credit_type = credit_type;
        CreditAccount::open(terms, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_short_term_next_month() {
        let resolver = DueDateResolver::new();
        let account = account(CreditType::ShortTerm);

        assert_eq!(resolver.next_due_date(&account, &[], date(2024, 3, 20)), date(2024, 4, 15));
        assert_eq!(resolver.next_due_date(&account, &[], date(2024, 3, 2)), date(2024, 3, 15));
        assert_eq!(resolver.next_due_date(&account, &[], date(2024, 12, 31)), date(2025, 1, 15));
    }

    #[test]
    fn test_long_term_uses_earliest_pending_installment() {
        let resolver = DueDateResolver::new();
        let account = account(CreditType::LongTerm);
        let purchase = Uuid::new_v4();

        let mut paid = Installment::new(account.id, purchase, 1, date(2024, 4, 1), Money::from_major(10));
        paid.apply(Money::from_major(10));
        let later = Installment::new(account.id, purchase, 3, date(2024, 6, 1), Money::from_major(10));
        let sooner = Installment::new(account.id, purchase, 2, date(2024, 5, 1), Money::from_major(10));

        let due = resolver.next_due_date(&account, &[paid, later, sooner], date(2024, 3, 20));
        assert_eq!(due, date(2024, 5, 1));
    }

    #[test]
    fn test_long_term_falls_back_to_monthly_rule() {
        let resolver = DueDateResolver::new();
        let account = account(CreditType::LongTerm);
        assert_eq!(resolver.next_due_date(&account, &[], date(2024, 3, 20)), date(2024, 4, 15));
    }
}

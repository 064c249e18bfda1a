use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::CreditAccount;
use crate::config::LedgerConfig;
use crate::dates;
use crate::decimal::{compound_factor, Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::installment::Installment;
use crate::types::{InterestType, TransactionId};

/// scheduled payment in an installment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
}

/// installment plan for one long-term purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub purchase_id: TransactionId,
    pub principal: Money,
    pub periodic_rate: Rate,
    pub payments: Vec<ScheduledPayment>,
    pub installments: Vec<Installment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl InstallmentPlan {
    pub fn count(&self) -> u32 {
        self.payments.len() as u32
    }

    pub fn first_due_date(&self) -> Option<NaiveDate> {
        self.payments.first().map(|p| p.due_date)
    }
}

/// splits long-term purchases into equal monthly installments
#[derive(Debug, Clone)]
pub struct InstallmentScheduler {
    pub planning_horizon_months: u32,
}

impl InstallmentScheduler {
    pub fn new(planning_horizon_months: u32) -> Self {
        Self {
            planning_horizon_months,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.planning_horizon_months)
    }

    /// installment count after the grace period eats into the horizon
    pub fn installment_count(&self, grace_period_months: u32) -> u32 {
        self.planning_horizon_months
            .saturating_sub(grace_period_months)
            .max(1)
    }

    /// monthly rate implied by the annual rate and its type
    pub fn periodic_rate(&self, annual_rate: Rate, interest_type: InterestType) -> Result<Rate> {
        match interest_type {
            InterestType::Nominal => Ok(annual_rate.monthly_rate()),
            InterestType::Effective => annual_rate
                .effective_periodic_rate(12)
                .ok_or_else(|| LedgerError::calculation("effective monthly rate overflowed")),
        }
    }

    /// due dates for `count` installments starting after the grace period
    pub fn due_dates(&self, today: NaiveDate, due_day: u8, grace_period_months: u32, count: u32) -> Vec<NaiveDate> {
        let shifted = dates::add_months(today, grace_period_months);
        let mut anchor = dates::clamped_date(shifted.year(), shifted.month(), due_day as u32);
        if anchor <= today {
            let (year, month) = dates::shift_month(anchor.year(), anchor.month(), 1);
            anchor = dates::clamped_date(year, month, due_day as u32);
        }

        (0..count)
            .map(|k| {
                let (year, month) = dates::shift_month(anchor.year(), anchor.month(), k);
                dates::clamped_date(year, month, due_day as u32)
            })
            .collect()
    }

    /// build the plan for a purchase posted on `today`
    pub fn schedule(
        &self,
        account: &CreditAccount,
        principal: Money,
        purchase_id: TransactionId,
        today: NaiveDate,
    ) -> Result<InstallmentPlan> {
        if !principal.is_positive() {
            return Err(LedgerError::validation("installment principal must be positive"));
        }

        let n = self.installment_count(account.grace_period_months);
        let periodic_rate = self.periodic_rate(account.annual_rate, account.interest_type)?;
        let payment = calculate_installment_amount(principal, periodic_rate, n)?;
        let due_dates = self.due_dates(today, account.monthly_due_day, account.grace_period_months, n);

        let rounded = payment.round_currency();
        let plan_total = (payment * Decimal::from(n)).round_currency();
        let i = periodic_rate.as_decimal();

        let mut payments = Vec::with_capacity(n as usize);
        let mut balance = principal;
        let mut scheduled = Money::ZERO;

        for (idx, due_date) in due_dates.into_iter().enumerate() {
            let sequence = idx as u32 + 1;
            let payment_amount = if sequence == n {
                // last installment absorbs rounding residue
                plan_total - scheduled
            } else {
                rounded
            };
            scheduled += payment_amount;

            let interest_portion = (balance * i).round_currency();
            let principal_portion = if sequence == n {
                balance
            } else {
                payment_amount - interest_portion
            };
            let ending_balance = (balance - principal_portion).max(Money::ZERO);

            payments.push(ScheduledPayment {
                sequence,
                due_date,
                beginning_balance: balance,
                payment_amount,
                principal_portion,
                interest_portion: payment_amount - principal_portion,
                ending_balance,
            });

            balance = ending_balance;
        }

        let total_payment: Money = payments.iter().map(|p| p.payment_amount).sum();
        let total_interest = total_payment - principal;

        let installments = payments
            .iter()
            .map(|p| Installment::new(account.id, purchase_id, p.sequence, p.due_date, p.payment_amount))
            .collect();

        Ok(InstallmentPlan {
            purchase_id,
            principal,
            periodic_rate,
            payments,
            installments,
            total_interest,
            total_payment,
        })
    }
}

impl Default for InstallmentScheduler {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

/// level payment for `n` periods at periodic rate `i`
///
/// P * i(1+i)^n / ((1+i)^n - 1), or P / n when i is zero
pub fn calculate_installment_amount(principal: Money, periodic_rate: Rate, n: u32) -> Result<Money> {
    if n == 0 {
        return Err(LedgerError::calculation("installment count must be positive"));
    }

    let i = periodic_rate.as_decimal();
    if i.is_zero() {
        return Ok(principal / Decimal::from(n));
    }

    let factor = compound_factor(i, n);
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(LedgerError::calculation("degenerate annuity factor"));
    }

    Ok(Money::from_decimal(principal.as_decimal() * i * factor / denominator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountTerms;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn installment_account(due_day: u8, rate: u32, grace: u32) -> CreditAccount {
        let terms = AccountTerms::installment(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(10_000),
            due_day,
            Rate::from_percentage(rate),
            grace,
        );
        CreditAccount::open(terms, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_twelve_equal_installments() {
        let scheduler = InstallmentScheduler::default();
        let account = installment_account(10, 12, 0);

        let plan = scheduler
            .schedule(&account, Money::from_major(1_200), Uuid::new_v4(), date(2024, 1, 5))
            .unwrap();

        assert_eq!(plan.count(), 12);
        // 1200 at 1% monthly over 12 periods ~= 106.62
        assert_eq!(plan.payments[0].payment_amount, Money::from_str_exact("106.62").unwrap());

        let total: Money = plan.installments.iter().map(|i| i.amount).sum();
        assert_eq!(total, plan.total_payment);
        // total interest ~= 79.42
        let diff = (plan.total_interest - Money::from_str_exact("79.42").unwrap()).abs();
        assert!(diff <= Money::from_str_exact("0.05").unwrap());

        assert_eq!(plan.first_due_date(), Some(date(2024, 1, 10)));
        assert_eq!(plan.payments[11].due_date, date(2024, 12, 10));
        assert_eq!(plan.payments[11].ending_balance, Money::ZERO);
    }

    #[test]
    fn test_due_dates_strictly_increase_and_clamp() {
        let scheduler = InstallmentScheduler::default();
        let dates = scheduler.due_dates(date(2024, 1, 20), 31, 0, 4);

        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_first_due_date_rolls_past_today() {
        let scheduler = InstallmentScheduler::default();
        let dates = scheduler.due_dates(date(2024, 1, 20), 10, 0, 2);
        assert_eq!(dates, vec![date(2024, 2, 10), date(2024, 3, 10)]);

        // due day equal to today is not after today
        let dates = scheduler.due_dates(date(2024, 1, 10), 10, 0, 1);
        assert_eq!(dates, vec![date(2024, 2, 10)]);
    }

    #[test]
    fn test_grace_period_shortens_and_delays() {
        let scheduler = InstallmentScheduler::default();
        let account = installment_account(5, 12, 3);

        let plan = scheduler
            .schedule(&account, Money::from_major(900), Uuid::new_v4(), date(2024, 1, 15))
            .unwrap();

        assert_eq!(plan.count(), 9);
        assert_eq!(plan.first_due_date(), Some(date(2024, 4, 5)));
    }

    #[test]
    fn test_grace_beyond_horizon_keeps_one_installment() {
        let scheduler = InstallmentScheduler::default();
        assert_eq!(scheduler.installment_count(12), 1);
        assert_eq!(scheduler.installment_count(40), 1);
        assert_eq!(scheduler.installment_count(2), 10);
    }

    #[test]
    fn test_zero_rate_splits_evenly_with_residue_on_last() {
        let scheduler = InstallmentScheduler::new(3);
        let account = installment_account(10, 0, 0);

        let plan = scheduler
            .schedule(&account, Money::from_major(100), Uuid::new_v4(), date(2024, 1, 1))
            .unwrap();

        let amounts: Vec<Money> = plan.installments.iter().map(|i| i.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Money::from_str_exact("33.33").unwrap(),
                Money::from_str_exact("33.33").unwrap(),
                Money::from_str_exact("33.34").unwrap(),
            ]
        );
        assert_eq!(plan.total_interest, Money::ZERO);
    }

    #[test]
    fn test_effective_rate_is_cheaper_than_nominal() {
        let scheduler = InstallmentScheduler::default();
        let nominal = scheduler.periodic_rate(Rate::from_percentage(12), InterestType::Nominal).unwrap();
        let effective = scheduler.periodic_rate(Rate::from_percentage(12), InterestType::Effective).unwrap();

        assert_eq!(nominal.as_decimal(), dec!(0.01));
        assert!(effective < nominal);
    }

    #[test]
    fn test_rejects_non_positive_principal() {
        let scheduler = InstallmentScheduler::default();
        let account = installment_account(10, 12, 0);
        let result = scheduler.schedule(&account, Money::ZERO, Uuid::new_v4(), date(2024, 1, 1));
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }
}

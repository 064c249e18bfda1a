use chrono::{DateTime, Utc};

use crate::account::CreditAccount;
use crate::config::LedgerConfig;
use crate::dates;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::installment::Installment;
use crate::interest::{period_factor, InterestCalculation, InterestCalculator};
use crate::types::{CreditType, InstallmentStatus, InterestType};

/// engine for accruing periodic interest on a credit account
#[derive(Debug, Clone)]
pub struct AccrualEngine {
    /// days per year used to prorate the annual rate
    pub day_count_basis: u32,
    /// calendar months that must elapse between accruals
    pub accrual_period_months: u32,
}

impl AccrualEngine {
    pub fn new(day_count_basis: u32, accrual_period_months: u32) -> Self {
        Self {
            day_count_basis,
            accrual_period_months,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.day_count_basis, config.accrual_period_months)
    }

    /// first instant at which the next accrual may fire
    pub fn next_accrual_at(&self, last_accrual: DateTime<Utc>) -> DateTime<Utc> {
        dates::add_months_utc(last_accrual, self.accrual_period_months)
    }

    /// a full accrual period has passed since `last_accrual`
    pub fn is_due(&self, last_accrual: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= self.next_accrual_at(last_accrual)
    }

    /// interest owed on a revolving balance over `days`
    pub fn revolving_interest(&self, account: &CreditAccount, days: u32) -> Result<Money> {
        let calc = self.calculate_interest(account.balance, account.annual_rate, account.interest_type, days)?;
        Ok(calc.interest_amount)
    }

    /// interest on the unpaid part of each pending installment not yet due
    pub fn installment_interest(
        &self,
        account: &CreditAccount,
        installments: &[Installment],
        now: DateTime<Utc>,
    ) -> Result<Money> {
        let today = now.date_naive();
        let mut total = Money::ZERO;

        for inst in installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Pending && i.due_date > today)
        {
            let calc = self.interest_between(
                inst.unpaid(),
                account.annual_rate,
                account.interest_type,
                today,
                inst.due_date,
            )?;
            total += calc.interest_amount;
        }

        Ok(total)
    }

    /// interest to post now, `None` while the accrual period is still running
    pub fn compute(
        &self,
        account: &CreditAccount,
        installments: &[Installment],
        now: DateTime<Utc>,
    ) -> Result<Option<AccrualOutcome>> {
        if !self.is_due(account.last_interest_accrual, now) {
            return Ok(None);
        }

        let days = dates::elapsed_days(account.last_interest_accrual, now);
        let raw = match account.credit_type {
            CreditType::ShortTerm => self.revolving_interest(account, days)?,
            CreditType::LongTerm => self.installment_interest(account, installments, now)?,
        };

        Ok(Some(AccrualOutcome {
            amount: raw.round_currency(),
            days,
            principal_base: account.balance,
        }))
    }
}

impl InterestCalculator for AccrualEngine {
    fn calculate_interest(
        &self,
        principal: Money,
        rate: Rate,
        interest_type: InterestType,
        days: u32,
    ) -> Result<InterestCalculation> {
        let factor = period_factor(rate, interest_type, days, self.day_count_basis)?;

        Ok(InterestCalculation {
            interest_amount: principal * factor,
            days,
            principal_base: principal,
            interest_type,
        })
    }
}

impl Default for AccrualEngine {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

/// accrual computed for one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccrualOutcome {
    /// rounded to cents, may be zero
    pub amount: Money,
    pub days: u32,
    pub principal_base: Money,
}

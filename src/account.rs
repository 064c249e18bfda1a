use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AccountTerms, TermsUpdate};
use crate::dates;
use crate::decimal::{Money, Rate};
use crate::types::{AccountId, AccountStatus, ClientId, CreditType, EstablishmentId, InterestType};

/// credit account state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAccount {
    // identification
    pub id: AccountId,
    pub client_id: ClientId,
    pub establishment_id: EstablishmentId,

    // balances
    pub credit_limit: Money,
    pub balance: Money,

    // terms
    pub monthly_due_day: u8,
    pub annual_rate: Rate,
    pub interest_type: InterestType,
    pub credit_type: CreditType,
    pub grace_period_months: u32,
    pub late_fee_percentage: Decimal,

    // status
    pub blocked: bool,
    pub status: AccountStatus,

    // dates
    pub last_interest_accrual: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// open a fresh account at zero balance
    pub fn open(terms: AccountTerms, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: terms.client_id,
            establishment_id: terms.establishment_id,
            credit_limit: terms.credit_limit,
            balance: Money::ZERO,
            monthly_due_day: terms.monthly_due_day,
            annual_rate: terms.annual_rate,
            interest_type: terms.interest_type,
            credit_type: terms.credit_type,
            grace_period_months: terms.grace_period_months,
            late_fee_percentage: terms.late_fee_percentage,
            blocked: false,
            status: AccountStatus::Active,
            last_interest_accrual: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// remaining headroom under the limit, zero when over it
    pub fn available_credit(&self) -> Money {
        (self.credit_limit - self.balance).max(Money::ZERO)
    }

    pub fn can_draw(&self, amount: Money) -> bool {
        self.balance + amount <= self.credit_limit
    }

    /// this month's due date
    pub fn due_date_in_month(&self, today: NaiveDate) -> NaiveDate {
        dates::due_date_in_month(today, self.monthly_due_day)
    }

    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        dates::days_overdue(today, self.monthly_due_day)
    }

    /// apply a partial terms change, returns whether anything changed
    pub fn apply_terms(&mut self, update: &TermsUpdate, now: DateTime<Utc>) -> bool {
        let before = self.clone();

        if let Some(limit) = update.credit_limit {
            self.credit_limit = limit;
        }
        if let Some(day) = update.monthly_due_day {
            self.monthly_due_day = day;
        }
        if let Some(rate) = update.annual_rate {
            self.annual_rate = rate;
        }
        if let Some(interest_type) = update.interest_type {
            self.interest_type = interest_type;
        }
        if let Some(grace) = update.grace_period_months {
            self.grace_period_months = grace;
        }
        if let Some(percentage) = update.late_fee_percentage {
            self.late_fee_percentage = percentage;
        }
        if let Some(blocked) = update.blocked {
            self.blocked = blocked;
        }

        let changed = *self != before;
        if changed {
            self.updated_at = now;
        }
        changed
    }
}

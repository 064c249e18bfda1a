use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{ClientId, CreditType, EstablishmentId, InterestType};

/// engine-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// months an installment purchase is spread over before grace is removed
    pub planning_horizon_months: u32,
    /// minimum calendar months between two interest accruals
    pub accrual_period_months: u32,
    /// days per year used to prorate the annual rate
    pub day_count_basis: u32,
    /// decimal places of posted amounts
    pub currency_scale: u32,
    /// digits in a generated payment code
    pub payment_code_length: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            planning_horizon_months: 12,
            accrual_period_months: 1,
            day_count_basis: 365,
            currency_scale: 2,
            payment_code_length: 6,
        }
    }
}

impl LedgerConfig {
    /// load from json, missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::validation(format!("invalid ledger config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::validation(format!("cannot serialize ledger config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.planning_horizon_months == 0 {
            return Err(LedgerError::validation("planning horizon must be at least one month"));
        }
        if self.accrual_period_months == 0 {
            return Err(LedgerError::validation("accrual period must be at least one month"));
        }
        if self.day_count_basis == 0 {
            return Err(LedgerError::validation("day count basis must be positive"));
        }
        if self.currency_scale > 8 {
            return Err(LedgerError::validation("currency scale cannot exceed working precision"));
        }
        if self.payment_code_length == 0 || self.payment_code_length > 12 {
            return Err(LedgerError::validation("payment code length must be between 1 and 12"));
        }
        Ok(())
    }
}

/// terms a credit account is opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTerms {
    pub client_id: ClientId,
    pub establishment_id: EstablishmentId,
    pub credit_limit: Money,
    pub monthly_due_day: u8,
    pub annual_rate: Rate,
    pub interest_type: InterestType,
    pub credit_type: CreditType,
    pub grace_period_months: u32,
    /// flat late fee, percent of balance
    pub late_fee_percentage: Decimal,
}

impl AccountTerms {
    /// revolving credit with a monthly due day
    pub fn revolving(
        client_id: ClientId,
        establishment_id: EstablishmentId,
        credit_limit: Money,
        monthly_due_day: u8,
        annual_rate: Rate,
    ) -> Self {
        Self {
            client_id,
            establishment_id,
            credit_limit,
            monthly_due_day,
            annual_rate,
            interest_type: InterestType::Nominal,
            credit_type: CreditType::ShortTerm,
            grace_period_months: 0,
            late_fee_percentage: Decimal::ZERO,
        }
    }

    /// installment credit, every purchase is split into monthly installments
    pub fn installment(
        client_id: ClientId,
        establishment_id: EstablishmentId,
        credit_limit: Money,
        monthly_due_day: u8,
        annual_rate: Rate,
        grace_period_months: u32,
    ) -> Self {
        Self {
            credit_type: CreditType::LongTerm,
            grace_period_months,
            ..Self::revolving(client_id, establishment_id, credit_limit, monthly_due_day, annual_rate)
        }
    }

    pub fn with_interest_type(mut self, interest_type: InterestType) -> Self {
        self.interest_type = interest_type;
        self
    }

    pub fn with_late_fee_percentage(mut self, percentage: Decimal) -> Self {
        self.late_fee_percentage = percentage;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.credit_limit.is_positive() {
            return Err(LedgerError::validation("credit limit must be positive"));
        }
        validate_due_day(self.monthly_due_day)?;
        if self.annual_rate.is_negative() {
            return Err(LedgerError::validation("interest rate cannot be negative"));
        }
        if self.late_fee_percentage < Decimal::ZERO {
            return Err(LedgerError::validation("late fee percentage cannot be negative"));
        }
        Ok(())
    }
}

/// partial change to an account's terms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermsUpdate {
    pub credit_limit: Option<Money>,
    pub monthly_due_day: Option<u8>,
    pub annual_rate: Option<Rate>,
    pub interest_type: Option<InterestType>,
    pub grace_period_months: Option<u32>,
    pub late_fee_percentage: Option<Decimal>,
    pub blocked: Option<bool>,
}

impl TermsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &TermsUpdate::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.credit_limit {
            if !limit.is_positive() {
                return Err(LedgerError::validation("credit limit must be positive"));
            }
        }
        if let Some(day) = self.monthly_due_day {
            validate_due_day(day)?;
        }
        if let Some(rate) = self.annual_rate {
            if rate.is_negative() {
                return Err(LedgerError::validation("interest rate cannot be negative"));
            }
        }
        if let Some(percentage) = self.late_fee_percentage {
            if percentage < Decimal::ZERO {
                return Err(LedgerError::validation("late fee percentage cannot be negative"));
            }
        }
        Ok(())
    }
}

fn validate_due_day(day: u8) -> Result<()> {
    if !(1..=31).contains(&day) {
        return Err(LedgerError::validation(format!(
            "monthly due day must be between 1 and 31, got {}",
            day
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.planning_horizon_months, 12);
        assert_eq!(config.day_count_basis, 365);
        assert_eq!(config.payment_code_length, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = LedgerConfig::from_json(r#"{"planning_horizon_months": 6}"#).unwrap();
        assert_eq!(config.planning_horizon_months, 6);
        assert_eq!(config.accrual_period_months, 1);

        let json = config.to_json().unwrap();
        assert_eq!(LedgerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_rejects_zero_horizon() {
        let result = LedgerConfig::from_json(r#"{"planning_horizon_months": 0}"#);
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_installment_preset() {
        let terms = AccountTerms::installment(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(5_000),
            10,
            Rate::from_percentage(24),
            2,
        )
        .with_interest_type(InterestType::Effective);

        assert_eq!(terms.credit_type, CreditType::LongTerm);
        assert_eq!(terms.interest_type, InterestType::Effective);
        assert_eq!(terms.grace_period_months, 2);
        assert!(terms.validate().is_ok());
    }

    #[test]
    fn test_terms_validation() {
        let base = AccountTerms::revolving(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1_000),
            15,
            Rate::from_percentage(12),
        );

        let mut bad_day = base.clone();
        bad_day.monthly_due_day = 32;
        assert!(bad_day.validate().is_err());

        let mut bad_limit = base.clone();
        bad_limit.credit_limit = Money::ZERO;
        assert!(bad_limit.validate().is_err());

        let bad_fee = base.clone().with_late_fee_percentage(dec!(-1));
        assert!(bad_fee.validate().is_err());

        assert!(base.validate().is_ok());
    }

    #[test]
    fn test_terms_update_validation() {
        assert!(TermsUpdate::default().is_empty());

        let update = TermsUpdate {
            monthly_due_day: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = TermsUpdate {
            annual_rate: Some(Rate::from_percentage(18)),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(update.validate().is_ok());
    }
}

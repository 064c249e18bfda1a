use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::EstablishmentId;

/// how a late fee tier charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeType {
    /// percent of the current balance
    Percentage,
    /// flat amount
    Fixed,
}

/// establishment-scoped late fee tier covering `[min_days, max_days)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeeRule {
    pub establishment_id: EstablishmentId,
    pub min_days: u32,
    /// open ended when absent
    pub max_days: Option<u32>,
    pub fee_type: FeeType,
    pub value: Decimal,
}

impl LateFeeRule {
    pub fn percentage(establishment_id: EstablishmentId, min_days: u32, max_days: Option<u32>, value: Decimal) -> Self {
        Self {
            establishment_id,
            min_days,
            max_days,
            fee_type: FeeType::Percentage,
            value,
        }
    }

    pub fn fixed(establishment_id: EstablishmentId, min_days: u32, max_days: Option<u32>, value: Decimal) -> Self {
        Self {
            establishment_id,
            min_days,
            max_days,
            fee_type: FeeType::Fixed,
            value,
        }
    }

    pub fn covers(&self, days_overdue: u32) -> bool {
        days_overdue >= self.min_days && self.max_days.map_or(true, |max| days_overdue < max)
    }

    /// fee this tier charges on `balance`, rounded to cents
    pub fn fee_for(&self, balance: Money) -> Money {
        let fee = match self.fee_type {
            FeeType::Percentage => balance.percentage(self.value),
            FeeType::Fixed => Money::from_decimal(self.value),
        };
        fee.round_currency()
    }

    pub fn validate(&self) -> Result<()> {
        if self.value < Decimal::ZERO {
            return Err(LedgerError::validation("late fee value cannot be negative"));
        }
        if let Some(max) = self.max_days {
            if max <= self.min_days {
                return Err(LedgerError::validation(format!(
                    "late fee tier upper bound {} must exceed lower bound {}",
                    max, self.min_days
                )));
            }
        }
        Ok(())
    }
}

/// late fee selected for an overdue account
#[derive(Debug, Clone, PartialEq)]
pub struct LateFeeOutcome {
    pub fee: Money,
    pub days_overdue: u32,
    pub rule: LateFeeRule,
}

/// engine for selecting and computing tiered late fees
#[derive(Debug, Clone, Default)]
pub struct LateFeeEngine;

impl LateFeeEngine {
    pub fn new() -> Self {
        Self
    }

    /// the account's flat percentage as a single open-ended tier
    pub fn flat_rule(establishment_id: EstablishmentId, percentage: Decimal) -> LateFeeRule {
        LateFeeRule::percentage(establishment_id, 1, None, percentage)
    }

    /// first rule, in the given order, whose range contains `days_overdue`
    pub fn select_rule<'a>(&self, rules: &'a [LateFeeRule], days_overdue: u32) -> Option<&'a LateFeeRule> {
        rules.iter().find(|rule| rule.covers(days_overdue))
    }

    /// compute the fee, `None` when nothing is overdue
    ///
    /// falls back to the flat percentage when the establishment has no rules
    pub fn calculate(
        &self,
        establishment_id: EstablishmentId,
        rules: &[LateFeeRule],
        flat_percentage: Decimal,
        balance: Money,
        overdue_balance: Money,
        days_overdue: u32,
    ) -> Result<Option<LateFeeOutcome>> {
        if days_overdue == 0 || !overdue_balance.is_positive() {
            return Ok(None);
        }

        let fallback;
        let rules = if rules.is_empty() {
            fallback = [Self::flat_rule(establishment_id, flat_percentage)];
            &fallback[..]
        } else {
            rules
        };

        let rule = self
            .select_rule(rules, days_overdue)
            .ok_or(LedgerError::NoApplicableLateFeeRule { days_overdue })?;

        Ok(Some(LateFeeOutcome {
            fee: rule.fee_for(balance),
            days_overdue,
            rule: rule.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn tiers(establishment: EstablishmentId) -> Vec<LateFeeRule> {
        vec![
            LateFeeRule::fixed(establishment, 1, Some(8), dec!(10)),
            LateFeeRule::percentage(establishment, 8, Some(31), dec!(2)),
            LateFeeRule::percentage(establishment, 31, None, dec!(5)),
        ]
    }

    #[test]
    fn test_tier_bounds_are_half_open() {
        let rule = LateFeeRule::fixed(Uuid::new_v4(), 1, Some(8), dec!(10));
        assert!(!rule.covers(0));
        assert!(rule.covers(1));
        assert!(rule.covers(7));
        assert!(!rule.covers(8));
    }

    #[test]
    fn test_tiered_selection() {
        let establishment = Uuid::new_v4();
        let engine = LateFeeEngine::new();
        let rules = tiers(establishment);
        let balance = Money::from_major(500);

        let early = engine
            .calculate(establishment, &rules, dec!(0), balance, balance, 3)
            .unwrap()
            .unwrap();
        assert_eq!(early.fee, Money::from_major(10));

        let mid = engine
            .calculate(establishment, &rules, dec!(0), balance, balance, 8)
            .unwrap()
            .unwrap();
        assert_eq!(mid.fee, Money::from_major(10));
        assert_eq!(mid.rule.fee_type, FeeType::Percentage);

        let late = engine
            .calculate(establishment, &rules, dec!(0), balance, balance, 90)
            .unwrap()
            .unwrap();
        assert_eq!(late.fee, Money::from_major(25));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let establishment = Uuid::new_v4();
        let rules = vec![
            LateFeeRule::fixed(establishment, 1, None, dec!(7)),
            LateFeeRule::fixed(establishment, 1, Some(10), dec!(3)),
        ];
        let engine = LateFeeEngine::new();
        assert_eq!(engine.select_rule(&rules, 5).unwrap().value, dec!(7));
    }

    #[test]
    fn test_no_fee_when_not_overdue() {
        let establishment = Uuid::new_v4();
        let engine = LateFeeEngine::new();
        let balance = Money::from_major(500);

        assert_eq!(engine.calculate(establishment, &[], dec!(5), balance, balance, 0).unwrap(), None);
        assert_eq!(engine.calculate(establishment, &[], dec!(5), balance, Money::ZERO, 10).unwrap(), None);
    }

    #[test]
    fn test_flat_percentage_fallback() {
        let establishment = Uuid::new_v4();
        let engine = LateFeeEngine::new();
        let balance = Money::from_str_exact("333.33").unwrap();

        let outcome = engine
            .calculate(establishment, &[], dec!(3), balance, balance, 1)
            .unwrap()
            .unwrap();
        // 3% of 333.33 = 9.9999
        assert_eq!(outcome.fee, Money::from_major(10));
    }

    #[test]
    fn test_gap_in_tiers_is_an_error() {
        let establishment = Uuid::new_v4();
        let rules = vec![LateFeeRule::fixed(establishment, 10, None, dec!(5))];
        let engine = LateFeeEngine::new();
        let balance = Money::from_major(100);

        let result = engine.calculate(establishment, &rules, dec!(0), balance, balance, 4);
        assert_eq!(result, Err(LedgerError::NoApplicableLateFeeRule { days_overdue: 4 }));
    }

    #[test]
    fn test_rule_validation() {
        let establishment = Uuid::new_v4();
        assert!(LateFeeRule::fixed(establishment, 5, Some(5), dec!(1)).validate().is_err());
        assert!(LateFeeRule::fixed(establishment, 5, None, dec!(-1)).validate().is_err());
        assert!(LateFeeRule::percentage(establishment, 1, Some(30), dec!(2)).validate().is_ok());
    }
}

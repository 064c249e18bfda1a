pub mod accrual;
pub mod penalty;

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::InterestType;

pub use accrual::{AccrualEngine, AccrualOutcome};
pub use penalty::{FeeType, LateFeeEngine, LateFeeOutcome, LateFeeRule};

/// interest calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct InterestCalculation {
    pub interest_amount: Money,
    pub days: u32,
    pub principal_base: Money,
    pub interest_type: InterestType,
}

/// trait for interest calculations over a day span
pub trait InterestCalculator {
    fn calculate_interest(
        &self,
        principal: Money,
        rate: Rate,
        interest_type: InterestType,
        days: u32,
    ) -> Result<InterestCalculation>;

    /// interest between two calendar dates, zero when `end` is not after `start`
    fn interest_between(
        &self,
        principal: Money,
        rate: Rate,
        interest_type: InterestType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<InterestCalculation> {
        let days = crate::dates::days_between(start, end).max(0) as u32;
        self.calculate_interest(principal, rate, interest_type, days)
    }
}

/// growth factor of `rate` over `days` of a `basis`-day year, minus one
///
/// nominal: r * d / basis
/// effective: (1 + r)^(d / basis) - 1
pub fn period_factor(rate: Rate, interest_type: InterestType, days: u32, basis: u32) -> Result<Decimal> {
    if basis == 0 {
        return Err(LedgerError::calculation("day count basis must be positive"));
    }
    if days == 0 || rate.as_decimal().is_zero() {
        return Ok(Decimal::ZERO);
    }
    let fraction = Decimal::from(days) / Decimal::from(basis);
    match interest_type {
        InterestType::Nominal => Ok(rate.as_decimal() * fraction),
        InterestType::Effective => {
            let factor = (Decimal::ONE + rate.as_decimal())
                .checked_powd(fraction)
                .ok_or_else(|| LedgerError::calculation("effective rate power overflowed"))?;
            Ok(factor - Decimal::ONE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nominal_factor() {
        let factor = period_factor(Rate::from_percentage(12), InterestType::Nominal, 365, 365).unwrap();
        assert_eq!(factor, dec!(0.12));

        let factor = period_factor(Rate::from_percentage(12), InterestType::Nominal, 0, 365).unwrap();
        assert_eq!(factor, Decimal::ZERO);
    }

    #[test]
    fn test_effective_factor() {
        // a full year at 12% effective is exactly 12%
        let factor = period_factor(Rate::from_percentage(12), InterestType::Effective, 365, 365).unwrap();
        assert!((factor - dec!(0.12)).abs() < dec!(0.000001));

        // shorter than a year compounds to less than the nominal proration
        let effective = period_factor(Rate::from_percentage(12), InterestType::Effective, 30, 365).unwrap();
        let nominal = period_factor(Rate::from_percentage(12), InterestType::Nominal, 30, 365).unwrap();
        assert!(effective < nominal);
        assert!(effective > Decimal::ZERO);
    }

    #[test]
    fn test_zero_basis_is_an_error() {
        let result = period_factor(Rate::from_percentage(12), InterestType::Nominal, 30, 0);
        assert!(matches!(result, Err(LedgerError::Calculation { .. })));
    }
}

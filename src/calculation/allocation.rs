//! Premium allocation between employer and employee.
//!
//! This module applies the half-share rounding rules, derives the
//! employer-borne dependent premiums and prorates figures for employees
//! paid by several employers.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Which rounding rule applies to the employee's half share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Fractions of 0.5 or less round down, above 0.5 round up.
    Standard,
    /// Fractions of 0.5 or more round up, below 0.5 round down.
    /// Used while the employee pays directly during unapproved leave.
    DirectTransfer,
}

/// Rounds a half share to whole yen under the given rule.
///
/// # Example
///
/// ```
/// use premium_engine::calculation::{RoundingMode, round_half_share};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let half = Decimal::from_str("10000.50").unwrap();
/// assert_eq!(round_half_share(half, RoundingMode::Standard), Decimal::from(10000));
/// assert_eq!(round_half_share(half, RoundingMode::DirectTransfer), Decimal::from(10001));
/// ```
pub fn round_half_share(half: Decimal, mode: RoundingMode) -> Decimal {
    let strategy = match mode {
        RoundingMode::Standard => RoundingStrategy::MidpointTowardZero,
        RoundingMode::DirectTransfer => RoundingStrategy::MidpointAwayFromZero,
    };
    half.round_dp_with_strategy(0, strategy)
}

/// Rounds to the nearest whole yen, halves away from zero.
pub fn round_nearest(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// The split of one insurance premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceAllocation {
    /// The full premium, always twice the rounded employee half.
    pub full_premium: Decimal,
    /// The employee's rounded half.
    pub employee_share: Decimal,
    /// `full_premium - employee_share`.
    pub employer_share: Decimal,
}

impl InsuranceAllocation {
    /// An allocation with every amount zero.
    pub const ZERO: InsuranceAllocation = InsuranceAllocation {
        full_premium: Decimal::ZERO,
        employee_share: Decimal::ZERO,
        employer_share: Decimal::ZERO,
    };
}

/// Splits one insurance premium from its unrounded half share.
///
/// The full premium is `2 × rounded_half`, never the unrounded full-rate
/// value, and the employer pays the remainder.
pub fn allocate(half: Decimal, mode: RoundingMode) -> InsuranceAllocation {
    let employee_share = round_half_share(half, mode);
    let full_premium = employee_share * Decimal::TWO;
    InsuranceAllocation {
        full_premium,
        employee_share,
        employer_share: full_premium - employee_share,
    }
}

/// Returns the employer-borne premium for dependents.
///
/// Each dependent contributes `2 × half`, unrounded.
pub fn dependent_premium(half: Decimal, dependent_count: u32) -> Decimal {
    half * Decimal::TWO * Decimal::from(dependent_count)
}

/// The complete health and pension allocation for one calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumAllocation {
    /// Health insurance split.
    pub health: InsuranceAllocation,
    /// Pension insurance split.
    pub pension: InsuranceAllocation,
    /// Employer-borne dependent health premium.
    pub dependent_health: Decimal,
    /// Employer-borne dependent pension premium.
    pub dependent_pension: Decimal,
}

impl PremiumAllocation {
    /// Builds the allocation from the two half shares.
    pub fn from_halves(
        health_half: Decimal,
        pension_half: Decimal,
        dependent_count: u32,
        mode: RoundingMode,
    ) -> Self {
        Self {
            health: allocate(health_half, mode),
            pension: allocate(pension_half, mode),
            dependent_health: dependent_premium(health_half, dependent_count),
            dependent_pension: dependent_premium(pension_half, dependent_count),
        }
    }

    /// `health + pension` full premiums.
    pub fn total_premium(&self) -> Decimal {
        self.health.full_premium + self.pension.full_premium
    }

    /// The employee's share of both insurances.
    pub fn employee_share(&self) -> Decimal {
        self.health.employee_share + self.pension.employee_share
    }

    /// The employer's share of both insurances plus dependent premiums.
    pub fn company_share(&self) -> Decimal {
        self.health.employer_share
            + self.pension.employer_share
            + self.dependent_health
            + self.dependent_pension
    }

    /// Scales every figure by the salary ratio of a dual-employed employee.
    ///
    /// Each scaled figure is rounded to the nearest yen independently and
    /// the employer share is recomputed from the scaled figures.
    pub fn prorate(&self, ratio: Decimal) -> Self {
        Self {
            health: prorate_insurance(&self.health, ratio),
            pension: prorate_insurance(&self.pension, ratio),
            dependent_health: round_nearest(self.dependent_health * ratio),
            dependent_pension: round_nearest(self.dependent_pension * ratio),
        }
    }
}

fn prorate_insurance(allocation: &InsuranceAllocation, ratio: Decimal) -> InsuranceAllocation {
    let full_premium = round_nearest(allocation.full_premium * ratio);
    let employee_share = round_nearest(allocation.employee_share * ratio);
    InsuranceAllocation {
        full_premium,
        employee_share,
        employer_share: full_premium - employee_share,
    }
}

//! Frozen calculation inputs.
//!
//! Every calculation record keeps the exact inputs it was derived from so a
//! historical recalculation can reproduce "what was known then" without
//! touching live master data.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CalculationKind, LeaveCollectionMethod, LeaveRecord, Period, RateTableEntry};

/// Salary-ratio proration data for a dual-employed employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proration {
    /// Amount paid by this organization.
    pub own_amount: Decimal,
    /// Confirmed amounts paid by the other employers.
    pub other_amounts: Vec<Decimal>,
}

impl Proration {
    /// Returns `own / (own + Σ other)`, or one when the denominator is zero.
    pub fn ratio(&self) -> Decimal {
        let total = self.own_amount + self.other_amounts.iter().copied().sum::<Decimal>();
        if total.is_zero() {
            Decimal::ONE
        } else {
            self.own_amount / total
        }
    }
}

/// An employee share deferred by an earlier record during postpaid leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredShare {
    /// The record that deferred the share.
    pub calculation_id: Uuid,
    /// The period of that record.
    pub period: Period,
    /// Whether the deferral came from a monthly or bonus record.
    pub kind: CalculationKind,
    /// The deferred employee share.
    pub amount: Decimal,
}

/// Inputs of a monthly premium calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyInputs {
    /// The employee number, used in error messages.
    pub employee_number: String,
    /// The target month.
    pub period: Period,
    /// The standard monthly reward.
    pub standard_reward: Decimal,
    /// The employee's date of birth.
    pub birth_date: NaiveDate,
    /// Number of dependents whose premium the employer bears.
    pub dependent_count: u32,
    /// The employee's leave spells.
    pub leave_records: Vec<LeaveRecord>,
    /// The organization's collection method for unapproved leave.
    pub collection_method: LeaveCollectionMethod,
    /// The rate table rows effective for the period.
    pub rate_table: Vec<RateTableEntry>,
    /// Proration data when dual-employed.
    #[serde(default)]
    pub proration: Option<Proration>,
    /// Shares deferred earlier in the employee's leave spells.
    #[serde(default)]
    pub deferred_history: Vec<DeferredShare>,
}

/// Inputs of a bonus premium calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusInputs {
    /// The employee number, used in error messages.
    pub employee_number: String,
    /// The month the bonus is paid.
    pub period: Period,
    /// The gross bonus amount.
    pub bonus_amount: Decimal,
    /// The employee's date of birth.
    pub birth_date: NaiveDate,
    /// Number of dependents whose premium the employer bears.
    pub dependent_count: u32,
    /// The employee's leave spells.
    pub leave_records: Vec<LeaveRecord>,
    /// The organization's collection method for unapproved leave.
    pub collection_method: LeaveCollectionMethod,
    /// The rate table rows effective for the period.
    pub rate_table: Vec<RateTableEntry>,
    /// Proration data when dual-employed.
    #[serde(default)]
    pub proration: Option<Proration>,
    /// Health standard bonus already counted earlier in the fiscal year.
    pub fiscal_year_cumulative_before: Decimal,
    /// Confirmed or exported bonus calculations earlier in the determination period.
    pub prior_finalized_bonus_count: u32,
}

/// The inputs a calculation record was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationInputs {
    /// Monthly premium inputs.
    Monthly(MonthlyInputs),
    /// Bonus premium inputs.
    Bonus(BonusInputs),
}

impl CalculationInputs {
    /// Returns the calculation kind these inputs belong to.
    pub fn kind(&self) -> CalculationKind {
        match self {
            CalculationInputs::Monthly(_) => CalculationKind::Monthly,
            CalculationInputs::Bonus(_) => CalculationKind::Bonus,
        }
    }
}

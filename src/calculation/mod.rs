//! Calculation logic for the Premium Engine.
//!
//! This module contains the pure premium rules: rate table resolution,
//! age-based coverage and population eligibility, leave evaluation, the
//! allocation and rounding of shares, and the monthly and bonus
//! calculators built on top of them.

mod allocation;
mod assembly;
mod audit;
mod bonus;
mod eligibility;
mod leave;
mod monthly;
mod rate_table;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{AuditStep, BonusDetails, CalculationInputs, PremiumFigures};

pub use allocation::{
    InsuranceAllocation, PremiumAllocation, RoundingMode, allocate, dependent_premium,
    round_half_share, round_nearest,
};
pub use audit::AuditTrail;
pub use bonus::{
    BONUS_PAYMENTS_PER_DETERMINATION_PERIOD, HEALTH_BONUS_FISCAL_YEAR_CAP,
    PENSION_BONUS_PAYMENT_CAP, calculate_bonus, cap_health_standard_bonus,
    cap_pension_standard_bonus, standard_bonus_amount,
};
pub use eligibility::{
    CARE_INSURANCE_END_AGE, CARE_INSURANCE_START_AGE, Ineligibility, InsuranceCoverage,
    LATE_STAGE_ELDERLY_AGE, PENSION_END_AGE, check_eligibility,
};
pub use leave::{
    ExemptionReason, LeaveEvaluation, LeaveState, SAME_MONTH_EXEMPTION_MIN_DAYS,
    approved_exemption, carry_forward_period, evaluate_leave, return_period, spell_covers,
    spell_length_days, spell_months,
};
pub use monthly::calculate_monthly;
pub use rate_table::{resolve_grade, resolve_pension_grade, select_effective_tables};

/// The result of deriving figures from a set of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    /// The monetary result.
    pub figures: PremiumFigures,
    /// Bonus amounts, for bonus calculations.
    pub bonus: Option<BonusDetails>,
    /// Notes to attach to the record.
    pub notes: Vec<String>,
    /// The decisions made, in order.
    pub audit_trace: Vec<AuditStep>,
}

/// Where the inputs of a derivation come from.
#[derive(Debug, Clone)]
pub enum InputSource<'a> {
    /// Inputs frozen in an existing record.
    Frozen(&'a CalculationInputs),
    /// Inputs freshly gathered from live master data.
    Live(CalculationInputs),
}

impl InputSource<'_> {
    /// Returns the inputs regardless of origin.
    pub fn inputs(&self) -> &CalculationInputs {
        match self {
            InputSource::Frozen(inputs) => inputs,
            InputSource::Live(inputs) => inputs,
        }
    }

    /// Returns owned inputs, cloning frozen ones.
    pub fn into_owned(self) -> CalculationInputs {
        match self {
            InputSource::Frozen(inputs) => inputs.clone(),
            InputSource::Live(inputs) => inputs,
        }
    }
}

/// Derives figures from inputs of either kind.
///
/// Historical and current recalculation both go through here; only the
/// source of the inputs differs.
pub fn derive(source: &InputSource<'_>) -> EngineResult<CalculationOutcome> {
    match source.inputs() {
        CalculationInputs::Monthly(inputs) => calculate_monthly(inputs),
        CalculationInputs::Bonus(inputs) => calculate_bonus(inputs),
    }
}

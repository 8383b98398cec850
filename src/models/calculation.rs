//! Premium calculation records.
//!
//! This module contains the persisted [`PremiumCalculation`] record and the
//! structures it is composed of: the monetary figures, postpaid leave
//! amounts, recalculation history, retroactive deductions and the audit
//! trace.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CalculationInputs, Period};

/// Current version of the persisted record layout.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Whether a record covers a monthly premium or a bonus payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationKind {
    /// Monthly premium based on the standard reward.
    Monthly,
    /// Premium on a bonus payment.
    Bonus,
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationKind::Monthly => write!(f, "monthly"),
            CalculationKind::Bonus => write!(f, "bonus"),
        }
    }
}

/// Lifecycle status of a calculation record.
///
/// ```
/// use premium_engine::models::CalculationStatus;
///
/// assert!(CalculationStatus::Confirmed.is_finalized());
/// assert!(!CalculationStatus::Draft.is_finalized());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStatus {
    /// Freshly calculated; may be overwritten or deleted.
    Draft,
    /// Approved by a payroll officer.
    Confirmed,
    /// Handed over to payroll/export.
    Exported,
}

impl CalculationStatus {
    /// Returns true for statuses that only change through recalculation.
    pub fn is_finalized(&self) -> bool {
        matches!(self, CalculationStatus::Confirmed | CalculationStatus::Exported)
    }
}

impl fmt::Display for CalculationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationStatus::Draft => write!(f, "draft"),
            CalculationStatus::Confirmed => write!(f, "confirmed"),
            CalculationStatus::Exported => write!(f, "exported"),
        }
    }
}

/// Where a recalculation takes its inputs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalculationMode {
    /// Re-derive from the inputs frozen in the record.
    Historical,
    /// Re-derive from live master data.
    Current,
}

/// A share carried forward from a postpaid leave month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedForwardShare {
    /// The record that deferred the share.
    pub calculation_id: Uuid,
    /// The leave month the share belongs to.
    pub period: Period,
    /// Whether the deferral came from a monthly or bonus record.
    pub kind: CalculationKind,
    /// The deferred amount now collected.
    pub amount: Decimal,
}

/// Amounts affected by postpaid collection during unapproved leave.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostpaidLeaveAmounts {
    /// This month's employee share, deferred until return to work.
    pub deferred_employee_share: Decimal,
    /// Deferred shares of the leave collected in this month.
    pub carried_forward: Vec<CarriedForwardShare>,
    /// Sum of `carried_forward`.
    pub carried_forward_total: Decimal,
}

/// The monetary result of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumFigures {
    /// The resolved health grade.
    pub grade: Option<u32>,
    /// The resolved pension grade.
    pub pension_grade: Option<u32>,
    /// Full health premium for the employee.
    pub health_premium: Decimal,
    /// Full pension premium for the employee.
    pub pension_premium: Decimal,
    /// Employer-borne health premium for dependents.
    pub dependent_health_premium: Decimal,
    /// Employer-borne pension premium for dependents.
    pub dependent_pension_premium: Decimal,
    /// `health_premium + pension_premium`.
    pub total_premium: Decimal,
    /// The employer's share, including dependent premiums.
    pub company_share: Decimal,
    /// The employee's share payable this month, before carry-forward.
    pub employee_share: Decimal,
    /// Postpaid leave amounts, when any apply.
    #[serde(default)]
    pub postpaid: Option<PostpaidLeaveAmounts>,
}

impl PremiumFigures {
    /// Returns figures with every amount set to zero.
    pub fn zero(grade: Option<u32>, pension_grade: Option<u32>) -> Self {
        Self {
            grade,
            pension_grade,
            health_premium: Decimal::ZERO,
            pension_premium: Decimal::ZERO,
            dependent_health_premium: Decimal::ZERO,
            dependent_pension_premium: Decimal::ZERO,
            total_premium: Decimal::ZERO,
            company_share: Decimal::ZERO,
            employee_share: Decimal::ZERO,
            postpaid: None,
        }
    }

    /// The employee share deferred this month under postpaid collection.
    pub fn deferred_employee_share(&self) -> Decimal {
        self.postpaid
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.deferred_employee_share)
    }

    /// The amount billed to the employee this month, including carry-forward.
    pub fn employee_payable(&self) -> Decimal {
        self.employee_share
            + self
                .postpaid
                .as_ref()
                .map_or(Decimal::ZERO, |p| p.carried_forward_total)
    }

    /// Sum of the employer-borne dependent premiums.
    pub fn dependent_premium(&self) -> Decimal {
        self.dependent_health_premium + self.dependent_pension_premium
    }
}

/// Bonus-specific amounts recorded on bonus calculations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusDetails {
    /// The gross bonus amount.
    pub bonus_amount: Decimal,
    /// The bonus rounded down to the nearest thousand.
    pub standard_bonus_amount: Decimal,
    /// Standard bonus used for health premiums after the fiscal-year cap.
    pub health_standard_bonus: Decimal,
    /// Standard bonus used for pension premiums after the per-payment cap.
    pub pension_standard_bonus: Decimal,
    /// Health standard bonus already counted earlier in the fiscal year.
    pub fiscal_year_cumulative_before: Decimal,
}

/// A snapshot taken before a recalculation overwrote the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationEntry {
    /// When the recalculation happened.
    pub recalculated_at: DateTime<Utc>,
    /// Who triggered it.
    pub recalculated_by: String,
    /// Which inputs were used.
    pub mode: RecalculationMode,
    /// Optional reason given by the actor.
    #[serde(default)]
    pub reason: Option<String>,
    /// The figures before the recalculation.
    pub previous: PremiumFigures,
    /// The notes before the recalculation.
    #[serde(default)]
    pub previous_notes: Vec<String>,
}

/// A premium-difference correction for other months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetroactiveDeduction {
    /// Unique identifier for the correction.
    pub id: Uuid,
    /// The months whose records receive the correction.
    pub target_months: Vec<Period>,
    /// The premium difference added to each target month.
    pub amount: Decimal,
    /// Who applied the correction.
    pub applied_by: String,
    /// When the correction was applied.
    pub applied_at: DateTime<Utc>,
}

/// A single step in the audit trace recording a calculation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A persisted premium calculation for one employee and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumCalculation {
    /// Unique identifier for the record.
    pub id: Uuid,
    /// Layout version of the record.
    pub schema_version: u32,
    /// Write counter, bumped by the store on every successful write.
    #[serde(default)]
    pub revision: u64,
    /// The organization.
    pub organization_id: String,
    /// The employee id.
    pub employee_id: String,
    /// The employee number.
    pub employee_number: String,
    /// The target month.
    pub period: Period,
    /// Monthly or bonus.
    pub kind: CalculationKind,
    /// Lifecycle status.
    pub status: CalculationStatus,
    /// The monetary result.
    pub figures: PremiumFigures,
    /// Bonus amounts, for bonus records.
    #[serde(default)]
    pub bonus: Option<BonusDetails>,
    /// Explanatory notes attached during calculation.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Snapshots taken before each recalculation, oldest first.
    #[serde(default)]
    pub recalculation_history: Vec<RecalculationEntry>,
    /// Corrections to be added to other months.
    #[serde(default)]
    pub retroactive_deductions: Vec<RetroactiveDeduction>,
    /// The inputs the figures were derived from.
    pub inputs: CalculationInputs,
    /// The decisions made during calculation.
    #[serde(default)]
    pub audit_trace: Vec<AuditStep>,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// Who last calculated the figures.
    pub calculated_by: String,
    /// When the figures were last calculated.
    pub calculated_at: DateTime<Utc>,
    /// Who confirmed the record.
    #[serde(default)]
    pub confirmed_by: Option<String>,
    /// When the record was confirmed.
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Who exported the record.
    #[serde(default)]
    pub exported_by: Option<String>,
    /// When the record was exported.
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeaveCollectionMethod, MonthlyInputs};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_sample_figures() -> PremiumFigures {
        PremiumFigures {
            grade: Some(22),
            pension_grade: Some(19),
            health_premium: dec("34740"),
            pension_premium: dec("54900"),
            dependent_health_premium: dec("34740"),
            dependent_pension_premium: dec("54900"),
            total_premium: dec("89640"),
            company_share: dec("134460"),
            employee_share: dec("44820"),
            postpaid: None,
        }
    }

    fn create_sample_record() -> PremiumCalculation {
        let now = Utc::now();
        PremiumCalculation {
            id: Uuid::new_v4(),
            schema_version: RECORD_SCHEMA_VERSION,
            revision: 0,
            organization_id: "org_001".to_string(),
            employee_id: "emp_001".to_string(),
            employee_number: "E001".to_string(),
            period: Period::new(2025, 4).unwrap(),
            kind: CalculationKind::Monthly,
            status: CalculationStatus::Confirmed,
            figures: create_sample_figures(),
            bonus: None,
            notes: vec!["note".to_string()],
            recalculation_history: vec![],
            retroactive_deductions: vec![],
            inputs: CalculationInputs::Monthly(MonthlyInputs {
                employee_number: "E001".to_string(),
                period: Period::new(2025, 4).unwrap(),
                standard_reward: dec("300000"),
                birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                dependent_count: 1,
                leave_records: vec![],
                collection_method: LeaveCollectionMethod::Postpaid,
                rate_table: vec![],
                proration: None,
                deferred_history: vec![],
            }),
            audit_trace: vec![],
            created_at: now,
            calculated_by: "officer".to_string(),
            calculated_at: now,
            confirmed_by: Some("manager".to_string()),
            confirmed_at: Some(now),
            exported_by: None,
            exported_at: None,
        }
    }

    #[test]
    fn test_shares_balance_against_premiums() {
        let figures = create_sample_figures();
        assert_eq!(
            figures.employee_share + figures.company_share,
            figures.total_premium + figures.dependent_premium()
        );
    }

    #[test]
    fn test_employee_payable_includes_carry_forward() {
        let mut figures = create_sample_figures();
        assert_eq!(figures.employee_payable(), dec("44820"));

        figures.postpaid = Some(PostpaidLeaveAmounts {
            deferred_employee_share: Decimal::ZERO,
            carried_forward: vec![],
            carried_forward_total: dec("89640"),
        });
        assert_eq!(figures.employee_payable(), dec("134460"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CalculationStatus::Exported).unwrap(),
            "\"exported\""
        );
        assert_eq!(CalculationStatus::Draft.to_string(), "draft");
    }

    #[test]
    fn test_record_round_trip_preserves_money_and_status() {
        let record = create_sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: PremiumCalculation = serde_json::from_str(&json).unwrap();

        assert_eq!(back.figures, record.figures);
        assert_eq!(back.status, CalculationStatus::Confirmed);
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_deserializes_without_optional_fields() {
        let record = create_sample_record();
        let mut json = serde_json::to_value(&record).unwrap();
        let object = json.as_object_mut().unwrap();
        for key in [
            "bonus",
            "notes",
            "recalculation_history",
            "retroactive_deductions",
            "audit_trace",
            "confirmed_by",
            "confirmed_at",
            "exported_by",
            "exported_at",
        ] {
            object.remove(key);
        }

        let back: PremiumCalculation = serde_json::from_value(json).unwrap();
        assert!(back.notes.is_empty());
        assert_eq!(back.confirmed_by, None);
        assert_eq!(back.figures, record.figures);
    }
}

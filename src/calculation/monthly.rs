//! Monthly premium calculation.
//!
//! Derives the monthly health and pension premiums from frozen
//! [`MonthlyInputs`]. Reading master data happens elsewhere; this function
//! is pure so historical recalculation reproduces the original result.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::MonthlyInputs;

use super::CalculationOutcome;
use super::assembly::{AssemblyContext, ResolvedHalves, assemble_figures};
use super::audit::AuditTrail;
use super::eligibility::InsuranceCoverage;
use super::leave::evaluate_leave;
use super::rate_table::{resolve_grade, resolve_pension_grade};

/// Calculates the monthly premium for one employee and month.
///
/// Steps, each recorded in the audit trace:
/// 1. age on the first day of the month decides care and pension coverage;
/// 2. the standard reward resolves to a health grade and a pension grade;
/// 3. the leave state decides exemption, deferral or inverted rounding;
/// 4. halves are allocated, prorated when dual-employed, and deferred
///    shares from an earlier unapproved leave are carried forward.
///
/// # Errors
///
/// Returns `GradeNotFound` or `PensionGradeNotFound` when the standard
/// reward falls outside the table.
pub fn calculate_monthly(inputs: &MonthlyInputs) -> EngineResult<CalculationOutcome> {
    let mut trail = AuditTrail::new();
    let mut notes = Vec::new();

    let coverage = InsuranceCoverage::on(inputs.birth_date, inputs.period);
    trail.record(
        "age_coverage",
        "Age-Based Coverage",
        serde_json::json!({
            "birth_date": inputs.birth_date.to_string(),
            "period": inputs.period.to_string(),
        }),
        serde_json::json!(coverage),
        format!(
            "Age {} on {}: care insurance {}, pension {}",
            coverage.age,
            inputs.period.first_day(),
            if coverage.care_insurance { "applies" } else { "does not apply" },
            if coverage.pension_insurance { "applies" } else { "does not apply" },
        ),
    );
    if !coverage.pension_insurance {
        notes.push(format!("Pension insurance not charged at age {}", coverage.age));
    }

    let entry = resolve_grade(
        inputs.standard_reward,
        &inputs.rate_table,
        &inputs.employee_number,
        inputs.period,
    )?;
    let health_half = entry.health_rate(coverage.care_insurance).half_share;

    let (pension_grade, pension_half) = if coverage.pension_insurance {
        let pension_entry = resolve_pension_grade(
            inputs.standard_reward,
            &inputs.rate_table,
            &inputs.employee_number,
            inputs.period,
        )?;
        (
            pension_entry.pension_grade,
            pension_entry.pension_insurance.half_share,
        )
    } else {
        (None, Decimal::ZERO)
    };

    trail.record(
        "grade_resolution",
        "Standard Reward Grade",
        serde_json::json!({
            "standard_reward": inputs.standard_reward.normalize().to_string(),
            "with_care": coverage.care_insurance,
        }),
        serde_json::json!({
            "grade": entry.grade,
            "pension_grade": pension_grade,
            "health_half": health_half.normalize().to_string(),
            "pension_half": pension_half.normalize().to_string(),
        }),
        format!(
            "Standard reward {} falls in grade {} (bracket from {})",
            inputs.standard_reward.normalize(),
            entry.grade,
            entry.min_amount.normalize()
        ),
    );

    let leave = evaluate_leave(
        &inputs.leave_records,
        inputs.period,
        inputs.collection_method,
        &inputs.deferred_history,
    );

    let halves = ResolvedHalves {
        grade: Some(entry.grade),
        pension_grade,
        health_half,
        pension_half,
    };
    let context = AssemblyContext {
        dependent_count: inputs.dependent_count,
        leave: &leave,
        proration: inputs.proration.as_ref(),
    };
    let figures = assemble_figures(&halves, &context, &mut trail, &mut notes);

    Ok(CalculationOutcome {
        figures,
        bonus: None,
        notes,
        audit_trace: trail.into_steps(),
    })
}

//! Bonus premium calculation.
//!
//! Applies the standard bonus rounding, the fiscal-year health cap and the
//! per-payment pension cap before the shared allocation steps.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{BonusDetails, BonusInputs};

use super::CalculationOutcome;
use super::assembly::{AssemblyContext, ResolvedHalves, assemble_figures};
use super::audit::AuditTrail;
use super::eligibility::InsuranceCoverage;
use super::leave::evaluate_leave;
use super::rate_table::{resolve_grade, resolve_pension_grade};

/// Cumulative health standard bonus allowed per fiscal year (April-March).
pub const HEALTH_BONUS_FISCAL_YEAR_CAP: i64 = 5_730_000;

/// Pension standard bonus allowed per payment.
pub const PENSION_BONUS_PAYMENT_CAP: i64 = 1_500_000;

/// Bonus payments per determination period above which a payment may be
/// treated as remuneration.
pub const BONUS_PAYMENTS_PER_DETERMINATION_PERIOD: u32 = 3;

/// Rounds a bonus down to the nearest thousand yen.
///
/// ```
/// use premium_engine::calculation::standard_bonus_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(standard_bonus_amount(Decimal::from(1_234_567)), Decimal::from(1_234_000));
/// ```
pub fn standard_bonus_amount(bonus_amount: Decimal) -> Decimal {
    let thousand = Decimal::from(1_000);
    (bonus_amount / thousand).floor() * thousand
}

/// Clamps the standard bonus so the fiscal-year health total stays within the cap.
pub fn cap_health_standard_bonus(standard_bonus: Decimal, cumulative_before: Decimal) -> Decimal {
    let remaining =
        (Decimal::from(HEALTH_BONUS_FISCAL_YEAR_CAP) - cumulative_before).max(Decimal::ZERO);
    standard_bonus.min(remaining)
}

/// Caps the standard bonus for pension at the per-payment limit.
pub fn cap_pension_standard_bonus(standard_bonus: Decimal) -> Decimal {
    standard_bonus.min(Decimal::from(PENSION_BONUS_PAYMENT_CAP))
}

/// Calculates the premium on one bonus payment.
///
/// Half shares are `capped standard bonus × rate / 2`, with the rate taken
/// from the table row the capped amount resolves to.
///
/// # Errors
///
/// Returns `GradeNotFound` or `PensionGradeNotFound` when a capped amount
/// falls outside the table.
pub fn calculate_bonus(inputs: &BonusInputs) -> EngineResult<CalculationOutcome> {
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
        format!("Age {} on {}", coverage.age, inputs.period.first_day()),
    );
    if !coverage.pension_insurance {
        notes.push(format!("Pension insurance not charged at age {}", coverage.age));
    }

    let standard_bonus = standard_bonus_amount(inputs.bonus_amount);
    let health_standard_bonus =
        cap_health_standard_bonus(standard_bonus, inputs.fiscal_year_cumulative_before);
    let pension_standard_bonus = if coverage.pension_insurance {
        cap_pension_standard_bonus(standard_bonus)
    } else {
        Decimal::ZERO
    };

    trail.record(
        "bonus_caps",
        "Standard Bonus Caps",
        serde_json::json!({
            "bonus_amount": inputs.bonus_amount.normalize().to_string(),
            "fiscal_year_cumulative_before": inputs.fiscal_year_cumulative_before.normalize().to_string(),
        }),
        serde_json::json!({
            "standard_bonus_amount": standard_bonus.normalize().to_string(),
            "health_standard_bonus": health_standard_bonus.normalize().to_string(),
            "pension_standard_bonus": pension_standard_bonus.normalize().to_string(),
        }),
        format!(
            "Standard bonus {} (health capped at {} for the fiscal year, pension at {} per payment)",
            standard_bonus.normalize(),
            HEALTH_BONUS_FISCAL_YEAR_CAP,
            PENSION_BONUS_PAYMENT_CAP
        ),
    );
    if health_standard_bonus < standard_bonus {
        notes.push(format!(
            "Health standard bonus limited to {} by the fiscal-year cap",
            health_standard_bonus.normalize()
        ));
    }

    let entry = resolve_grade(
        health_standard_bonus,
        &inputs.rate_table,
        &inputs.employee_number,
        inputs.period,
    )?;
    let health_half = entry
        .health_rate(coverage.care_insurance)
        .half_share_for(health_standard_bonus);

    let (pension_grade, pension_half) = if coverage.pension_insurance {
        let pension_entry = resolve_pension_grade(
            pension_standard_bonus,
            &inputs.rate_table,
            &inputs.employee_number,
            inputs.period,
        )?;
        (
            pension_entry.pension_grade,
            pension_entry
                .pension_insurance
                .half_share_for(pension_standard_bonus),
        )
    } else {
        (None, Decimal::ZERO)
    };

    trail.record(
        "bonus_rates",
        "Bonus Premium Rates",
        serde_json::json!({
            "health_standard_bonus": health_standard_bonus.normalize().to_string(),
            "pension_standard_bonus": pension_standard_bonus.normalize().to_string(),
        }),
        serde_json::json!({
            "health_rate": entry.health_rate(coverage.care_insurance).rate.normalize().to_string(),
            "health_half": health_half.normalize().to_string(),
            "pension_half": pension_half.normalize().to_string(),
        }),
        "Half shares derived from the capped standard bonus",
    );

    if inputs.prior_finalized_bonus_count >= BONUS_PAYMENTS_PER_DETERMINATION_PERIOD {
        let start = inputs.period.determination_period_start();
        trail.record(
            "bonus_frequency",
            "Bonus Payment Frequency",
            serde_json::json!({
                "determination_period_start": start.to_string(),
                "prior_finalized_bonus_count": inputs.prior_finalized_bonus_count,
            }),
            serde_json::json!({ "advisory": true }),
            "Fourth or later bonus in the determination period",
        );
        notes.push(format!(
            "Bonus #{} since {}: four or more payments a year may count as remuneration",
            inputs.prior_finalized_bonus_count + 1,
            start
        ));
    }

    // Carry-forward of deferred shares happens on monthly records only.
    let leave = evaluate_leave(
        &inputs.leave_records,
        inputs.period,
        inputs.collection_method,
        &[],
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
        bonus: Some(BonusDetails {
            bonus_amount: inputs.bonus_amount,
            standard_bonus_amount: standard_bonus,
            health_standard_bonus,
            pension_standard_bonus,
            fiscal_year_cumulative_before: inputs.fiscal_year_cumulative_before,
        }),
        notes,
        audit_trace: trail.into_steps(),
    })
}

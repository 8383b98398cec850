//! Turns resolved half shares into premium figures.
//!
//! Shared by the monthly and bonus calculators: applies the leave state,
//! the allocation and rounding rules, salary-ratio proration, postpaid
//! deferral and carry-forward collection, recording each decision.

use rust_decimal::Decimal;

use crate::models::{
    CarriedForwardShare, LeaveCollectionMethod, PostpaidLeaveAmounts, PremiumFigures, Proration,
};

use super::allocation::{PremiumAllocation, RoundingMode};
use super::audit::AuditTrail;
use super::leave::{LeaveEvaluation, LeaveState};

/// Grades and unrounded half shares resolved from the rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedHalves {
    pub grade: Option<u32>,
    pub pension_grade: Option<u32>,
    pub health_half: Decimal,
    pub pension_half: Decimal,
}

/// Everything besides the half shares that shapes the figures.
pub(crate) struct AssemblyContext<'a> {
    pub dependent_count: u32,
    pub leave: &'a LeaveEvaluation,
    pub proration: Option<&'a Proration>,
}

pub(crate) fn assemble_figures(
    halves: &ResolvedHalves,
    context: &AssemblyContext<'_>,
    trail: &mut AuditTrail,
    notes: &mut Vec<String>,
) -> PremiumFigures {
    let leave = context.leave;
    record_leave_state(leave, trail, notes);

    let mut figures = if leave.is_exempt() {
        PremiumFigures::zero(halves.grade, halves.pension_grade)
    } else {
        allocate_figures(halves, context, trail, notes)
    };

    if leave.is_postpaid() {
        let deferred = figures.employee_share;
        figures.employee_share = Decimal::ZERO;
        figures.postpaid = Some(PostpaidLeaveAmounts {
            deferred_employee_share: deferred,
            ..PostpaidLeaveAmounts::default()
        });
        trail.record(
            "postpaid_deferral",
            "Postpaid Leave Deferral",
            serde_json::json!({ "employee_share": deferred.normalize().to_string() }),
            serde_json::json!({ "deferred_employee_share": deferred.normalize().to_string() }),
            format!("Employee share of {} deferred until return to work", deferred.normalize()),
        );
        notes.push(format!(
            "Employee share of {} deferred during unapproved leave (postpaid)",
            deferred.normalize()
        ));
    }

    if !leave.carry_forward.is_empty() {
        attach_carry_forward(&mut figures, leave, trail, notes);
    }

    figures
}

fn record_leave_state(leave: &LeaveEvaluation, trail: &mut AuditTrail, notes: &mut Vec<String>) {
    let spell = leave.spell.as_ref().map(|spell| {
        serde_json::json!({
            "start_date": spell.start_date.to_string(),
            "end_date": spell.end_date.map(|d| d.to_string()),
            "is_approved": spell.is_approved,
        })
    });
    let reasoning = match leave.state {
        LeaveState::OnLeaveApprovedExempt => {
            notes.push("Premiums exempt during approved leave".to_string());
            format!("Approved leave exempts the month ({:?})", leave.exemption)
        }
        LeaveState::OnLeaveUnapproved => match leave.collection_method {
            Some(LeaveCollectionMethod::DirectTransfer) => {
                notes.push(
                    "Unapproved leave: employee pays by direct transfer, halves of 0.5 round up"
                        .to_string(),
                );
                "Unapproved leave collected by direct transfer".to_string()
            }
            _ => "Unapproved leave collected postpaid".to_string(),
        },
        LeaveState::Active if leave.short_approved_leave => {
            notes.push(format!(
                "Approved leave within one month shorter than {} days; premiums apply",
                super::leave::SAME_MONTH_EXEMPTION_MIN_DAYS
            ));
            "Approved leave too short to exempt the month".to_string()
        }
        LeaveState::Active => "No leave affects the month".to_string(),
    };

    trail.record(
        "leave_state",
        "Leave Eligibility",
        serde_json::json!({ "spell": spell }),
        serde_json::json!({
            "state": leave.state,
            "exemption": leave.exemption,
            "collection_method": leave.collection_method,
        }),
        reasoning,
    );
}

fn allocate_figures(
    halves: &ResolvedHalves,
    context: &AssemblyContext<'_>,
    trail: &mut AuditTrail,
    notes: &mut Vec<String>,
) -> PremiumFigures {
    let mode = if context.leave.is_direct_transfer() {
        RoundingMode::DirectTransfer
    } else {
        RoundingMode::Standard
    };

    let mut allocation = PremiumAllocation::from_halves(
        halves.health_half,
        halves.pension_half,
        context.dependent_count,
        mode,
    );

    trail.record(
        "premium_allocation",
        "Premium Allocation",
        serde_json::json!({
            "health_half": halves.health_half.normalize().to_string(),
            "pension_half": halves.pension_half.normalize().to_string(),
            "dependent_count": context.dependent_count,
            "rounding_mode": mode,
        }),
        serde_json::json!({
            "health_premium": allocation.health.full_premium.normalize().to_string(),
            "pension_premium": allocation.pension.full_premium.normalize().to_string(),
            "employee_share": allocation.employee_share().normalize().to_string(),
            "company_share": allocation.company_share().normalize().to_string(),
        }),
        format!(
            "Employee halves {} + {} rounded ({:?}); full premium is twice the rounded half",
            halves.health_half.normalize(),
            halves.pension_half.normalize(),
            mode
        ),
    );

    if let Some(proration) = context.proration {
        let ratio = proration.ratio();
        allocation = allocation.prorate(ratio);
        trail.record(
            "dual_employment_proration",
            "Dual Employment Proration",
            serde_json::json!({
                "own_amount": proration.own_amount.normalize().to_string(),
                "other_amounts": proration
                    .other_amounts
                    .iter()
                    .map(|a| a.normalize().to_string())
                    .collect::<Vec<_>>(),
            }),
            serde_json::json!({
                "ratio": ratio.normalize().to_string(),
                "total_premium": allocation.total_premium().normalize().to_string(),
                "employee_share": allocation.employee_share().normalize().to_string(),
            }),
            format!("Figures scaled by salary ratio {}", ratio.round_dp(6).normalize()),
        );
        notes.push(format!(
            "Prorated for dual employment by ratio {}",
            ratio.round_dp(6).normalize()
        ));
    }

    PremiumFigures {
        grade: halves.grade,
        pension_grade: halves.pension_grade,
        health_premium: allocation.health.full_premium,
        pension_premium: allocation.pension.full_premium,
        dependent_health_premium: allocation.dependent_health,
        dependent_pension_premium: allocation.dependent_pension,
        total_premium: allocation.total_premium(),
        company_share: allocation.company_share(),
        employee_share: allocation.employee_share(),
        postpaid: None,
    }
}

fn attach_carry_forward(
    figures: &mut PremiumFigures,
    leave: &LeaveEvaluation,
    trail: &mut AuditTrail,
    notes: &mut Vec<String>,
) {
    let carried_forward: Vec<CarriedForwardShare> = leave
        .carry_forward
        .iter()
        .map(|share| CarriedForwardShare {
            calculation_id: share.calculation_id,
            period: share.period,
            kind: share.kind,
            amount: share.amount,
        })
        .collect();
    let total = leave.carry_forward_total();
    let months: Vec<String> = carried_forward.iter().map(|s| s.period.to_string()).collect();

    trail.record(
        "postpaid_carry_forward",
        "Postpaid Carry-Forward",
        serde_json::json!({ "months": months }),
        serde_json::json!({ "carried_forward_total": total.normalize().to_string() }),
        format!(
            "Collecting {} deferred share(s) from leave months {}",
            carried_forward.len(),
            months.join(", ")
        ),
    );
    notes.push(format!(
        "Deferred leave premiums of {} collected this month ({})",
        total.normalize(),
        months.join(", ")
    ));

    let postpaid = figures.postpaid.get_or_insert_with(PostpaidLeaveAmounts::default);
    postpaid.carried_forward = carried_forward;
    postpaid.carried_forward_total = total;
}

//! Reads collaborators to build frozen calculation inputs.

use rust_decimal::Decimal;

use crate::calculation::{
    carry_forward_period, check_eligibility, select_effective_tables, spell_months,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BonusInputs, CalculationKind, CalculationStatus, DeferredShare, EmployeeInsuranceProfile,
    MonthlyInputs, OrganizationConfig, OtherCompanyCompensation, Period, Proration,
    RateTableEntry,
};
use crate::store::Collaborators;

/// The employee and organization a calculation is for.
#[derive(Debug, Clone)]
pub struct Subject {
    /// The employee's master data.
    pub employee: EmployeeInsuranceProfile,
    /// The employee's organization.
    pub organization: OrganizationConfig,
}

/// Loads the employee and their organization.
pub fn load_subject(store: &dyn Collaborators, employee_id: &str) -> EngineResult<Subject> {
    let employee = store
        .get_employee(employee_id)?
        .ok_or_else(|| EngineError::EmployeeNotFound {
            employee_id: employee_id.to_string(),
        })?;
    let organization = store
        .organization(&employee.organization_id)?
        .ok_or_else(|| EngineError::OrganizationNotFound {
            organization_id: employee.organization_id.clone(),
        })?;
    Ok(Subject {
        employee,
        organization,
    })
}

/// Fails with `EmployeeNotEligible` when the employee is outside the
/// calculable population for the period.
pub fn ensure_eligible(employee: &EmployeeInsuranceProfile, period: Period) -> EngineResult<()> {
    check_eligibility(employee, period).map_err(|reason| EngineError::EmployeeNotEligible {
        employee_number: employee.employee_number.clone(),
        period,
        reason: reason.to_string(),
    })
}

fn effective_tables(
    store: &dyn Collaborators,
    organization_id: &str,
    period: Period,
) -> EngineResult<Vec<RateTableEntry>> {
    let rows = store.list_rate_tables(organization_id)?;
    select_effective_tables(&rows, organization_id, period)
}

fn confirmed_other_amounts(
    employee: &EmployeeInsuranceProfile,
    period: Period,
    others: &[OtherCompanyCompensation],
) -> EngineResult<Vec<Decimal>> {
    if others.iter().any(|other| !other.is_confirmed) {
        return Err(EngineError::OtherCompanyDataNotConfirmed {
            employee_number: employee.employee_number.clone(),
            period,
        });
    }
    Ok(others.iter().map(|other| other.amount).collect())
}

/// Collects the deferred shares of the unapproved spells whose
/// carry-forward month is `period`.
fn deferred_history(
    store: &dyn Collaborators,
    employee: &EmployeeInsuranceProfile,
    period: Period,
) -> EngineResult<Vec<DeferredShare>> {
    let mut history = Vec::new();
    for leave in employee
        .leave_records
        .iter()
        .filter(|leave| !leave.is_approved && carry_forward_period(leave) == Some(period))
    {
        for month in spell_months(leave) {
            for record in store.query_by_employee(&employee.id, month)? {
                let amount = record.figures.deferred_employee_share();
                if amount > Decimal::ZERO {
                    history.push(DeferredShare {
                        calculation_id: record.id,
                        period: record.period,
                        kind: record.kind,
                        amount,
                    });
                }
            }
        }
    }
    Ok(history)
}

/// Builds the inputs of a monthly calculation from live master data.
///
/// # Errors
///
/// - `MissingStandardReward` when no standard reward is set
/// - `RateTableNotFound` when no rate table is effective
/// - `SalaryNotConfirmed` / `OtherCompanyDataNotConfirmed` for dual
///   employment without confirmed salaries on both sides
pub fn gather_monthly(
    store: &dyn Collaborators,
    subject: &Subject,
    period: Period,
) -> EngineResult<MonthlyInputs> {
    let employee = &subject.employee;
    let standard_reward = employee
        .standard_reward
        .ok_or_else(|| EngineError::MissingStandardReward {
            employee_number: employee.employee_number.clone(),
            period,
        })?;
    let rate_table = effective_tables(store, &subject.organization.id, period)?;

    let proration = if employee.is_dual_employed() {
        let own = store
            .monthly_salary(&employee.id, period)?
            .filter(|salary| salary.is_confirmed)
            .ok_or_else(|| EngineError::SalaryNotConfirmed {
                employee_number: employee.employee_number.clone(),
                period,
            })?;
        let others = store.other_company_salaries(&employee.id, period)?;
        if others.is_empty() {
            return Err(EngineError::OtherCompanyDataNotConfirmed {
                employee_number: employee.employee_number.clone(),
                period,
            });
        }
        Some(Proration {
            own_amount: own.amount,
            other_amounts: confirmed_other_amounts(employee, period, &others)?,
        })
    } else {
        None
    };

    Ok(MonthlyInputs {
        employee_number: employee.employee_number.clone(),
        period,
        standard_reward,
        birth_date: employee.birth_date,
        dependent_count: employee.dependents.len() as u32,
        leave_records: employee.leave_records.clone(),
        collection_method: subject.organization.leave_insurance_collection_method,
        rate_table,
        proration,
        deferred_history: deferred_history(store, employee, period)?,
    })
}

/// Builds the inputs of a bonus calculation from live master data.
///
/// The fiscal-year cumulative total sums the health standard bonus of the
/// employee's bonus records in earlier months of the same fiscal year.
pub fn gather_bonus(
    store: &dyn Collaborators,
    subject: &Subject,
    period: Period,
) -> EngineResult<BonusInputs> {
    let employee = &subject.employee;
    let bonus = store
        .bonus(&employee.id, period)?
        .filter(|bonus| bonus.is_confirmed)
        .ok_or_else(|| EngineError::BonusNotConfirmed {
            employee_number: employee.employee_number.clone(),
            period,
        })?;
    let rate_table = effective_tables(store, &subject.organization.id, period)?;

    let proration = if employee.is_dual_employed() {
        let others = store.other_company_bonuses(&employee.id, period)?;
        if others.is_empty() {
            None
        } else {
            Some(Proration {
                own_amount: bonus.amount,
                other_amounts: confirmed_other_amounts(employee, period, &others)?,
            })
        }
    } else {
        None
    };

    let earlier_bonuses: Vec<_> = store
        .list_by_employee(&employee.id)?
        .into_iter()
        .filter(|record| record.kind == CalculationKind::Bonus && record.period < period)
        .collect();

    let fiscal_year_start = period.fiscal_year_start();
    let fiscal_year_cumulative_before: Decimal = earlier_bonuses
        .iter()
        .filter(|record| record.period >= fiscal_year_start)
        .filter_map(|record| record.bonus.as_ref())
        .map(|details| details.health_standard_bonus)
        .sum();

    let determination_start = period.determination_period_start();
    let prior_finalized_bonus_count = earlier_bonuses
        .iter()
        .filter(|record| record.period >= determination_start)
        .filter(|record| record.status != CalculationStatus::Draft)
        .count() as u32;

    Ok(BonusInputs {
        employee_number: employee.employee_number.clone(),
        period,
        bonus_amount: bonus.amount,
        birth_date: employee.birth_date,
        dependent_count: employee.dependents.len() as u32,
        leave_records: employee.leave_records.clone(),
        collection_method: subject.organization.leave_insurance_collection_method,
        rate_table,
        proration,
        fiscal_year_cumulative_before,
        prior_finalized_bonus_count,
    })
}

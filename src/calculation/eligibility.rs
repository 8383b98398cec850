//! Age-based coverage and calculable-population rules.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{EmployeeInsuranceProfile, Period, age_on};

/// Age from which long-term care insurance is added to health insurance.
pub const CARE_INSURANCE_START_AGE: u32 = 40;

/// Age at which long-term care insurance stops being collected with health insurance.
pub const CARE_INSURANCE_END_AGE: u32 = 65;

/// Age at which employee pension contributions stop.
pub const PENSION_END_AGE: u32 = 70;

/// Age at which the employee leaves employee health insurance altogether.
pub const LATE_STAGE_ELDERLY_AGE: u32 = 75;

/// Which insurances apply to an employee in a month, based on age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceCoverage {
    /// Age in completed years on the first day of the month.
    pub age: u32,
    /// Health insurance is charged including long-term care.
    pub care_insurance: bool,
    /// Pension insurance is charged.
    pub pension_insurance: bool,
}

impl InsuranceCoverage {
    /// Determines coverage from the age on the first day of `period`.
    ///
    /// ```
    /// use premium_engine::calculation::InsuranceCoverage;
    /// use premium_engine::models::Period;
    /// use chrono::NaiveDate;
    ///
    /// let birth = NaiveDate::from_ymd_opt(1955, 6, 15).unwrap();
    /// let coverage = InsuranceCoverage::on(birth, Period::new(2025, 7).unwrap());
    /// assert_eq!(coverage.age, 70);
    /// assert!(!coverage.care_insurance);
    /// assert!(!coverage.pension_insurance);
    /// ```
    pub fn on(birth_date: NaiveDate, period: Period) -> Self {
        let age = age_on(birth_date, period.first_day());
        Self {
            age,
            care_insurance: (CARE_INSURANCE_START_AGE..CARE_INSURANCE_END_AGE).contains(&age),
            pension_insurance: age < PENSION_END_AGE,
        }
    }
}

/// Why an employee is outside the calculable population for a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    /// The employee joins after the month ends.
    NotYetJoined,
    /// The employee retired before the last day of the month.
    Retired,
    /// The employee is 75 or older.
    LateStageElderly,
    /// Another company is the primary employer.
    OtherPrimaryEmployer,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::NotYetJoined => write!(f, "joins after the period"),
            Ineligibility::Retired => write!(f, "retired before the end of the period"),
            Ineligibility::LateStageElderly => {
                write!(f, "aged {} or over", LATE_STAGE_ELDERLY_AGE)
            }
            Ineligibility::OtherPrimaryEmployer => {
                write!(f, "another company is the primary employer")
            }
        }
    }
}

/// Checks whether the employee belongs to the calculable population for `period`.
///
/// Employees must have joined on or before the last day of the month, not
/// have retired before it, be under 75 on the first day, and not be
/// registered with another primary employer.
pub fn check_eligibility(
    employee: &EmployeeInsuranceProfile,
    period: Period,
) -> Result<(), Ineligibility> {
    let last_day = period.last_day();
    if employee.join_date > last_day {
        return Err(Ineligibility::NotYetJoined);
    }
    if employee.retirement_date.is_some_and(|retired| retired < last_day) {
        return Err(Ineligibility::Retired);
    }
    if employee.age_on(period.first_day()) >= LATE_STAGE_ELDERLY_AGE {
        return Err(Ineligibility::LateStageElderly);
    }
    if employee.has_other_primary_employer() {
        return Err(Ineligibility::OtherPrimaryEmployer);
    }
    Ok(())
}

//! Employee insurance profile and related types.
//!
//! This module defines the master data the premium calculators read for an
//! employee: standard reward, dates, dependents, other employments and
//! leave spells.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dependent covered by the employee's health insurance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    /// The dependent's name.
    pub name: String,
    /// Relationship to the employee (e.g. "spouse", "child").
    pub relationship: String,
    /// The dependent's date of birth.
    pub birth_date: NaiveDate,
}

/// An employment the employee holds with another company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCompanyEmployment {
    /// Whether the other company is the employee's primary employer.
    pub is_primary: bool,
    /// The other company's name.
    pub company_name: String,
}

/// The kind of leave taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    /// Maternity leave before and after childbirth.
    Maternity,
    /// Childcare leave.
    Childcare,
    /// Leave due to illness or injury.
    Sick,
    /// Any other leave of absence.
    Other,
}

/// A single leave spell.
///
/// `is_approved` marks an officially sanctioned leave that can fully exempt
/// premiums. Unapproved leave defers collection instead of exempting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    /// The kind of leave.
    pub leave_type: LeaveType,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave; `None` while the leave is open-ended.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Whether the leave is officially approved for premium exemption.
    pub is_approved: bool,
}

/// The insurance master data for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInsuranceProfile {
    /// Unique identifier for the employee.
    pub id: String,
    /// The organization's employee number, shown in messages and exports.
    pub employee_number: String,
    /// The organization employing this employee.
    pub organization_id: String,
    /// Display name.
    pub name: String,
    /// The current standard monthly reward, if one has been determined.
    #[serde(default)]
    pub standard_reward: Option<Decimal>,
    /// The employee's date of birth.
    pub birth_date: NaiveDate,
    /// The date the employee joined the organization.
    pub join_date: NaiveDate,
    /// The employee's last working day, if they have retired.
    #[serde(default)]
    pub retirement_date: Option<NaiveDate>,
    /// Dependents covered by the employee's health insurance.
    #[serde(default)]
    pub dependents: Vec<Dependent>,
    /// Employments with other companies.
    #[serde(default)]
    pub other_company_employments: Vec<OtherCompanyEmployment>,
    /// Leave spells.
    #[serde(default)]
    pub leave_records: Vec<LeaveRecord>,
}

impl EmployeeInsuranceProfile {
    /// Returns the employee's age in completed years on the given date.
    ///
    /// # Example
    ///
    /// ```
    /// use premium_engine::models::EmployeeInsuranceProfile;
    /// use chrono::NaiveDate;
    ///
    /// let employee = EmployeeInsuranceProfile {
    ///     id: "emp_001".to_string(),
    ///     employee_number: "E001".to_string(),
    ///     organization_id: "org_001".to_string(),
    ///     name: "Sato Hanako".to_string(),
    ///     standard_reward: None,
    ///     birth_date: NaiveDate::from_ymd_opt(1985, 4, 2).unwrap(),
    ///     join_date: NaiveDate::from_ymd_opt(2010, 4, 1).unwrap(),
    ///     retirement_date: None,
    ///     dependents: vec![],
    ///     other_company_employments: vec![],
    ///     leave_records: vec![],
    /// };
    /// assert_eq!(employee.age_on(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()), 39);
    /// assert_eq!(employee.age_on(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap()), 40);
    /// ```
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        age_on(self.birth_date, date)
    }

    /// Returns true if the employee works for at least one other company.
    pub fn is_dual_employed(&self) -> bool {
        !self.other_company_employments.is_empty()
    }

    /// Returns true if another company is registered as the primary employer.
    pub fn has_other_primary_employer(&self) -> bool {
        self.other_company_employments.iter().any(|e| e.is_primary)
    }
}

/// Returns the age in completed years on `date` for someone born on `birth_date`.
pub fn age_on(birth_date: NaiveDate, date: NaiveDate) -> u32 {
    let mut age = date.year() - birth_date.year();
    if (date.month(), date.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

//! Configuration types for premium calculation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    CompensationRecord, EmployeeInsuranceProfile, OrganizationConfig, OtherCompanyCompensation,
    Period, PremiumRate, RateTableEntry,
};

/// One bracket of a rate schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeBracket {
    /// The health insurance grade.
    pub grade: u32,
    /// The pension grade mapped to this bracket, if any.
    #[serde(default)]
    pub pension_grade: Option<u32>,
    /// Lower bound of the bracket (inclusive).
    pub min: Decimal,
    /// Upper bound of the bracket (inclusive); omitted for the top bracket.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// The standard reward for health insurance.
    pub standard: Decimal,
    /// The standard reward for pension when it differs from `standard`.
    #[serde(default)]
    pub pension_standard: Option<Decimal>,
}

/// A rate schedule file under `rates/`.
///
/// Premium amounts are derived from the percentages, so a schedule only
/// lists the rates and the bracket boundaries.
#[derive(Debug, Clone, Deserialize)]
pub struct RateSchedule {
    /// First day the schedule applies.
    pub effective_from: NaiveDate,
    /// Last day the schedule applies; omitted while current.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Health insurance rate without care insurance, in percent.
    pub health_rate: Decimal,
    /// Health insurance rate including care insurance, in percent.
    pub health_with_care_rate: Decimal,
    /// Employee pension rate, in percent.
    pub pension_rate: Decimal,
    /// The grade brackets in ascending order.
    pub grades: Vec<GradeBracket>,
}

impl RateSchedule {
    /// Expands the schedule into rate table rows for an organization.
    ///
    /// # Example
    ///
    /// ```
    /// use premium_engine::config::RateSchedule;
    /// use rust_decimal::Decimal;
    ///
    /// let schedule: RateSchedule = serde_yaml::from_str(r#"
    /// effective_from: 2025-03-01
    /// health_rate: "9.91"
    /// health_with_care_rate: "11.50"
    /// pension_rate: "18.3"
    /// grades:
    ///   - { grade: 22, pension_grade: 19, min: 290000, max: 309999, standard: 300000 }
    /// "#).unwrap();
    ///
    /// let rows = schedule.to_entries("org_001");
    /// assert_eq!(rows[0].pension_insurance.total_premium, Decimal::from(54_900));
    /// ```
    pub fn to_entries(&self, organization_id: &str) -> Vec<RateTableEntry> {
        self.grades
            .iter()
            .map(|bracket| {
                let pension_standard = bracket.pension_standard.unwrap_or(bracket.standard);
                RateTableEntry {
                    organization_id: organization_id.to_string(),
                    grade: bracket.grade,
                    pension_grade: bracket.pension_grade,
                    min_amount: bracket.min,
                    max_amount: bracket.max,
                    standard_reward_amount: bracket.standard,
                    health_insurance_with_care: PremiumRate::from_rate(
                        bracket.standard,
                        self.health_with_care_rate,
                    ),
                    health_insurance_without_care: PremiumRate::from_rate(
                        bracket.standard,
                        self.health_rate,
                    ),
                    pension_insurance: PremiumRate::from_rate(pension_standard, self.pension_rate),
                    effective_from: self.effective_from,
                    effective_to: self.effective_to,
                }
            })
            .collect()
    }
}

/// The optional `employees.yaml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeesFile {
    /// The organization's employees.
    #[serde(default)]
    pub employees: Vec<EmployeeInsuranceProfile>,
}

/// A salary or bonus line in `compensation.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompensationEntry {
    /// The employee the amount was paid to.
    pub employee_id: String,
    /// Payment year.
    pub year: i32,
    /// Payment month.
    pub month: u32,
    /// The amount paid.
    pub amount: Decimal,
    /// Whether payroll has confirmed the amount.
    #[serde(default)]
    pub is_confirmed: bool,
    /// The paying company, for other-employer lines.
    #[serde(default)]
    pub company_name: Option<String>,
}

impl CompensationEntry {
    /// The month the amount was paid in.
    pub fn period(&self) -> EngineResult<Period> {
        Period::new(self.year, self.month)
    }

    /// The line as an own-company compensation record.
    pub fn to_record(&self) -> CompensationRecord {
        CompensationRecord {
            amount: self.amount,
            is_confirmed: self.is_confirmed,
        }
    }

    /// The line as another employer's compensation.
    pub fn to_other_company(&self) -> OtherCompanyCompensation {
        OtherCompanyCompensation {
            company_name: self.company_name.clone().unwrap_or_default(),
            amount: self.amount,
            is_confirmed: self.is_confirmed,
        }
    }
}

/// The optional `compensation.yaml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompensationFile {
    /// Own-company salaries.
    #[serde(default)]
    pub salaries: Vec<CompensationEntry>,
    /// Own-company bonuses.
    #[serde(default)]
    pub bonuses: Vec<CompensationEntry>,
    /// Salaries reported by other employers.
    #[serde(default)]
    pub other_company_salaries: Vec<CompensationEntry>,
    /// Bonuses reported by other employers.
    #[serde(default)]
    pub other_company_bonuses: Vec<CompensationEntry>,
}

/// The complete configuration of one organization.
#[derive(Debug, Clone)]
pub struct PremiumConfig {
    organization: OrganizationConfig,
    schedules: Vec<RateSchedule>,
    employees: Vec<EmployeeInsuranceProfile>,
    compensation: CompensationFile,
}

impl PremiumConfig {
    /// Creates a new configuration, sorting schedules by effective date.
    pub fn new(
        organization: OrganizationConfig,
        mut schedules: Vec<RateSchedule>,
        employees: Vec<EmployeeInsuranceProfile>,
        compensation: CompensationFile,
    ) -> Self {
        schedules.sort_by_key(|s| s.effective_from);
        Self {
            organization,
            schedules,
            employees,
            compensation,
        }
    }

    /// Returns the organization settings.
    pub fn organization(&self) -> &OrganizationConfig {
        &self.organization
    }

    /// Returns the rate schedules, oldest first.
    pub fn schedules(&self) -> &[RateSchedule] {
        &self.schedules
    }

    /// Returns the configured employees.
    pub fn employees(&self) -> &[EmployeeInsuranceProfile] {
        &self.employees
    }

    /// Returns the configured compensation lines.
    pub fn compensation(&self) -> &CompensationFile {
        &self.compensation
    }

    /// Expands every schedule into rate table rows.
    pub fn rate_rows(&self) -> Vec<RateTableEntry> {
        self.schedules
            .iter()
            .flat_map(|schedule| schedule.to_entries(&self.organization.id))
            .collect()
    }

    /// Checks that each schedule's brackets are ascending and contiguous and
    /// that no two schedules are effective in the same month.
    pub fn validate(&self, path: &str) -> EngineResult<()> {
        let invalid = |message: String| EngineError::ConfigParseError {
            path: path.to_string(),
            message,
        };

        for schedule in &self.schedules {
            if schedule.effective_to.is_some_and(|to| to < schedule.effective_from) {
                return Err(invalid(format!(
                    "schedule from {} ends before it starts",
                    schedule.effective_from
                )));
            }
            for pair in schedule.grades.windows(2) {
                let (lower, upper) = (&pair[0], &pair[1]);
                let max = match lower.max {
                    Some(max) if lower.min <= max && max < upper.min => max,
                    _ => {
                        return Err(invalid(format!(
                            "grades {} and {} of the schedule from {} overlap or are out of order",
                            lower.grade, upper.grade, schedule.effective_from
                        )));
                    }
                };
                if upper.min != max + Decimal::ONE {
                    return Err(invalid(format!(
                        "gap between grades {} and {} of the schedule from {}",
                        lower.grade, upper.grade, schedule.effective_from
                    )));
                }
            }
        }

        // Effective windows apply to whole months.
        for pair in self.schedules.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            let disjoint = earlier
                .effective_to
                .is_some_and(|to| Period::containing(to) < Period::containing(later.effective_from));
            if !disjoint {
                return Err(invalid(format!(
                    "schedules from {} and {} are effective in the same month",
                    earlier.effective_from, later.effective_from
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schedule(effective_from: &str, effective_to: Option<&str>) -> RateSchedule {
        let to = effective_to
            .map(|to| format!("effective_to: {}\n", to))
            .unwrap_or_default();
        serde_yaml::from_str(&format!(
            r#"
effective_from: {effective_from}
{to}health_rate: "9.91"
health_with_care_rate: "11.50"
pension_rate: "18.3"
grades:
  - {{ grade: 21, pension_grade: 18, min: 270000, max: 289999, standard: 280000 }}
  - {{ grade: 22, pension_grade: 19, min: 290000, max: 309999, standard: 300000 }}
  - {{ grade: 23, min: 310000, standard: 320000 }}
"#
        ))
        .unwrap()
    }

    fn create_test_config(schedules: Vec<RateSchedule>) -> PremiumConfig {
        let organization: OrganizationConfig = serde_yaml::from_str(
            "id: org_001\nname: Test Org\nleave_insurance_collection_method: postpaid\n",
        )
        .unwrap();
        PremiumConfig::new(organization, schedules, vec![], CompensationFile::default())
    }

    fn assert_invalid(config: &PremiumConfig, expected: &str) {
        match config.validate("rates") {
            Err(EngineError::ConfigParseError { message, .. }) => {
                assert!(message.contains(expected), "unexpected message: {}", message);
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_contiguous_consecutive_schedules() {
        let config = create_test_config(vec![
            create_test_schedule("2025-03-01", None),
            create_test_schedule("2024-03-01", Some("2025-02-28")),
        ]);
        assert!(config.validate("rates").is_ok());
    }

    #[test]
    fn test_validate_rejects_gap_between_brackets() {
        let mut schedule = create_test_schedule("2025-03-01", None);
        schedule.grades[1].min = Decimal::from(295_000);
        assert_invalid(&create_test_config(vec![schedule]), "gap between grades 21 and 22");
    }

    #[test]
    fn test_validate_rejects_overlapping_brackets() {
        let mut schedule = create_test_schedule("2025-03-01", None);
        schedule.grades[1].min = Decimal::from(280_000);
        assert_invalid(&create_test_config(vec![schedule]), "overlap or are out of order");
    }

    #[test]
    fn test_validate_rejects_open_schedule_followed_by_another() {
        let config = create_test_config(vec![
            create_test_schedule("2024-03-01", None),
            create_test_schedule("2025-03-01", None),
        ]);
        assert_invalid(&config, "effective in the same month");
    }

    #[test]
    fn test_validate_rejects_schedules_sharing_a_month() {
        // Mid-month switch: both windows cover March once truncated to months.
        let config = create_test_config(vec![
            create_test_schedule("2024-03-01", Some("2025-03-14")),
            create_test_schedule("2025-03-15", None),
        ]);
        assert_invalid(&config, "effective in the same month");
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = create_test_config(vec![create_test_schedule("2025-03-01", Some("2025-02-01"))]);
        assert_invalid(&config, "ends before it starts");
    }
}

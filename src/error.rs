//! Error types for the premium engine.
//!
//! Every failure carries enough context (employee number, period, record id)
//! to be shown to a payroll officer without further lookups.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{CalculationStatus, Period};
use crate::store::StoreError;

/// The main error type for the premium engine.
///
/// # Example
///
/// ```
/// use premium_engine::error::EngineError;
/// use premium_engine::models::Period;
///
/// let error = EngineError::MissingStandardReward {
///     employee_number: "E001".to_string(),
///     period: Period::new(2025, 4).unwrap(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Standard reward is not set for employee E001 (2025-04)"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// The employee has no standard reward.
    #[error("Standard reward is not set for employee {employee_number} ({period})")]
    MissingStandardReward {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
    },

    /// No rate table rows are effective for the organization and period.
    #[error("No rate table is effective for organization '{organization_id}' in {period}")]
    RateTableNotFound {
        /// The organization.
        organization_id: String,
        /// The target period.
        period: Period,
    },

    /// No health grade bracket contains the amount.
    #[error("No grade found for amount {amount} (employee {employee_number}, {period})")]
    GradeNotFound {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
        /// The amount that was looked up.
        amount: rust_decimal::Decimal,
    },

    /// No pension grade bracket contains the amount.
    #[error("No pension grade found for amount {amount} (employee {employee_number}, {period})")]
    PensionGradeNotFound {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
        /// The amount that was looked up.
        amount: rust_decimal::Decimal,
    },

    /// The employee's own salary is missing or unconfirmed.
    #[error("Salary for employee {employee_number} in {period} is not confirmed")]
    SalaryNotConfirmed {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
    },

    /// The bonus is missing or unconfirmed.
    #[error("Bonus for employee {employee_number} in {period} is not confirmed")]
    BonusNotConfirmed {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
    },

    /// Compensation reported by another employer is missing or unconfirmed.
    #[error("Other company compensation for employee {employee_number} in {period} is not confirmed")]
    OtherCompanyDataNotConfirmed {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
    },

    /// A confirmed or exported record already exists for the employee and period.
    #[error("Calculation for employee {employee_number} in {period} is already {status}")]
    AlreadyFinalized {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
        /// The status of the existing record.
        status: CalculationStatus,
    },

    /// The calculation record does not exist.
    #[error("Calculation record not found: {id}")]
    RecordNotFound {
        /// The missing record id.
        id: Uuid,
    },

    /// The requested status change is not allowed.
    #[error("Cannot {action} calculation {id} in status {status}")]
    InvalidStatusTransition {
        /// The record id.
        id: Uuid,
        /// The record's current status.
        status: CalculationStatus,
        /// The attempted operation.
        action: String,
    },

    /// The employee does not exist in the directory.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The missing employee id.
        employee_id: String,
    },

    /// The organization has no settings.
    #[error("Organization not found: {organization_id}")]
    OrganizationNotFound {
        /// The missing organization id.
        organization_id: String,
    },

    /// The employee is outside the calculable population for the period.
    #[error("Employee {employee_number} is not eligible for {period}: {reason}")]
    EmployeeNotEligible {
        /// The employee number.
        employee_number: String,
        /// The target period.
        period: Period,
        /// Why the employee was excluded.
        reason: String,
    },

    /// A year/month pair does not form a valid period.
    #[error("Invalid period {year}-{month}")]
    InvalidPeriod {
        /// The year given.
        year: i32,
        /// The month given.
        month: u32,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The export view could not be written.
    #[error("Export failed: {message}")]
    ExportError {
        /// A description of the failure.
        message: String,
    },

    /// A collaborator store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Returns a stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::MissingStandardReward { .. } => "MISSING_STANDARD_REWARD",
            EngineError::RateTableNotFound { .. } => "RATE_TABLE_NOT_FOUND",
            EngineError::GradeNotFound { .. } => "GRADE_NOT_FOUND",
            EngineError::PensionGradeNotFound { .. } => "PENSION_GRADE_NOT_FOUND",
            EngineError::SalaryNotConfirmed { .. } => "SALARY_NOT_CONFIRMED",
            EngineError::BonusNotConfirmed { .. } => "BONUS_NOT_CONFIRMED",
            EngineError::OtherCompanyDataNotConfirmed { .. } => "OTHER_COMPANY_DATA_NOT_CONFIRMED",
            EngineError::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            EngineError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            EngineError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            EngineError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
            EngineError::OrganizationNotFound { .. } => "ORGANIZATION_NOT_FOUND",
            EngineError::EmployeeNotEligible { .. } => "EMPLOYEE_NOT_ELIGIBLE",
            EngineError::InvalidPeriod { .. } => "INVALID_PERIOD",
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR"
            }
            EngineError::ExportError { .. } => "EXPORT_ERROR",
            EngineError::Store(_) => "STORE_ERROR",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

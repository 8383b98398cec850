//! Collaborator ports consumed by the lifecycle manager.
//!
//! The engine reads master data through four read-only traits and persists
//! calculation records through [`CalculationStore`]. Records are always
//! replaced whole, keyed by id, and every write is checked against the
//! stored record under the store's own lock.

mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CalculationKind, CompensationRecord, EmployeeInsuranceProfile, OrganizationConfig,
    OtherCompanyCompensation, Period, PremiumCalculation, RateTableEntry,
};

pub use memory::InMemoryStore;

/// Failures raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to employee master data.
pub trait EmployeeDirectory: Send + Sync {
    /// Returns the employee, if known.
    fn get_employee(&self, employee_id: &str) -> StoreResult<Option<EmployeeInsuranceProfile>>;

    /// Lists every employee of the organization.
    fn list_employees(&self, organization_id: &str) -> StoreResult<Vec<EmployeeInsuranceProfile>>;
}

/// Read access to premium rate tables.
pub trait RateTableStore: Send + Sync {
    /// Lists every rate row of the organization, across all effective windows.
    fn list_rate_tables(&self, organization_id: &str) -> StoreResult<Vec<RateTableEntry>>;
}

/// Read access to salary, bonus and other-employer compensation.
pub trait CompensationRecords: Send + Sync {
    /// The employee's salary for the month.
    fn monthly_salary(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Option<CompensationRecord>>;

    /// The employee's bonus paid in the month.
    fn bonus(&self, employee_id: &str, period: Period) -> StoreResult<Option<CompensationRecord>>;

    /// Salaries reported by the employee's other employers for the month.
    fn other_company_salaries(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<OtherCompanyCompensation>>;

    /// Bonuses reported by the employee's other employers for the month.
    fn other_company_bonuses(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<OtherCompanyCompensation>>;
}

/// Read access to organization settings.
pub trait OrganizationSettings: Send + Sync {
    /// Returns the organization's settings, if known.
    fn organization(&self, organization_id: &str) -> StoreResult<Option<OrganizationConfig>>;
}

/// Outcome of an attempted draft upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftUpsert {
    /// The draft was stored (created or replacing an earlier draft).
    Stored(PremiumCalculation),
    /// A finalized record already exists for the employee, period and kind.
    Finalized(PremiumCalculation),
}

/// Outcome of a revision-checked record replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    /// The record was stored; carries the stored copy with its new revision.
    Written(PremiumCalculation),
    /// No record with that id exists.
    Missing,
    /// The stored record moved on since it was read; carries the current copy.
    Conflict(PremiumCalculation),
}

/// Outcome of an attempted draft deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftDelete {
    /// The draft was removed.
    Deleted(PremiumCalculation),
    /// No record with that id exists.
    Missing,
    /// The record is confirmed or exported and was kept.
    Finalized(PremiumCalculation),
}

/// Persistence of calculation records.
pub trait CalculationStore: Send + Sync {
    /// Returns the record with the given id.
    fn get_calculation(&self, id: Uuid) -> StoreResult<Option<PremiumCalculation>>;

    /// Records of the organization for the period, newest first.
    fn query_by_period(
        &self,
        organization_id: &str,
        period: Period,
    ) -> StoreResult<Vec<PremiumCalculation>>;

    /// Records of the employee for the period, newest first.
    fn query_by_employee(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<PremiumCalculation>>;

    /// Every record of the employee, newest first.
    fn list_by_employee(&self, employee_id: &str) -> StoreResult<Vec<PremiumCalculation>>;

    /// Stores `draft` unless a finalized record of the same employee, period
    /// and kind exists; an existing draft is replaced, keeping its id and
    /// creation time. The check and the write happen atomically.
    fn upsert_draft(&self, draft: PremiumCalculation) -> StoreResult<DraftUpsert>;

    /// Replaces the whole record if the stored copy still has
    /// `record.revision`, bumping the revision. The check and the write
    /// happen atomically.
    fn replace_calculation(&self, record: PremiumCalculation) -> StoreResult<RecordWrite>;

    /// Removes the record only while it is a draft. The check and the
    /// removal happen atomically.
    fn delete_draft(&self, id: Uuid) -> StoreResult<DraftDelete>;
}

/// Everything the lifecycle manager needs, as one object.
pub trait Collaborators:
    EmployeeDirectory + RateTableStore + CompensationRecords + OrganizationSettings + CalculationStore
{
}

impl<T> Collaborators for T where
    T: EmployeeDirectory
        + RateTableStore
        + CompensationRecords
        + OrganizationSettings
        + CalculationStore
{
}

/// Returns true if `record` is the same employee, period and kind.
pub(crate) fn same_slot(
    record: &PremiumCalculation,
    employee_id: &str,
    period: Period,
    kind: CalculationKind,
) -> bool {
    record.employee_id == employee_id && record.period == period && record.kind == kind
}

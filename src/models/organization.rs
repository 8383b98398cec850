//! Organization settings and compensation records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How an employee's share is collected during unapproved leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveCollectionMethod {
    /// The share is deferred and collected in a lump sum on return to work.
    Postpaid,
    /// The employee pays the share directly, using inverted rounding.
    DirectTransfer,
}

/// Organization-level settings consumed by the calculators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    /// Unique identifier for the organization.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Collection method for employee shares during unapproved leave.
    pub leave_insurance_collection_method: LeaveCollectionMethod,
}

/// A salary or bonus payment record for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// The total amount paid.
    pub amount: Decimal,
    /// Whether payroll has confirmed the amount.
    pub is_confirmed: bool,
}

/// Compensation reported by another employer of a dual-employed employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherCompanyCompensation {
    /// The reporting company.
    pub company_name: String,
    /// The amount paid by that company.
    pub amount: Decimal,
    /// Whether the reported amount has been confirmed.
    pub is_confirmed: bool,
}

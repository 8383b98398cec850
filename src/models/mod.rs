//! Core data models for the premium engine.
//!
//! This module contains all the domain models used throughout the engine.

mod calculation;
mod employee;
mod inputs;
mod organization;
mod period;
mod rate_table;

pub use calculation::{
    AuditStep, BonusDetails, CalculationKind, CalculationStatus, CarriedForwardShare,
    PostpaidLeaveAmounts, PremiumCalculation, PremiumFigures, RECORD_SCHEMA_VERSION,
    RecalculationEntry, RecalculationMode, RetroactiveDeduction,
};
pub use employee::{
    Dependent, EmployeeInsuranceProfile, LeaveRecord, LeaveType, OtherCompanyEmployment, age_on,
};
pub use inputs::{BonusInputs, CalculationInputs, DeferredShare, MonthlyInputs, Proration};
pub use organization::{
    CompensationRecord, LeaveCollectionMethod, OrganizationConfig, OtherCompanyCompensation,
};
pub use period::Period;
pub use rate_table::{PremiumRate, RateTableEntry};

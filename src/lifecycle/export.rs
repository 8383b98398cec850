//! Tabular export view of finalized calculations.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationKind, CalculationStatus, Period, PremiumCalculation};

/// One line of the export view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// The employee number.
    pub employee_number: String,
    /// The target month, as `YYYY-MM`.
    pub period: String,
    /// Monthly or bonus.
    pub kind: CalculationKind,
    /// Confirmed or exported.
    pub status: CalculationStatus,
    /// The health grade.
    pub grade: Option<u32>,
    /// The pension grade.
    pub pension_grade: Option<u32>,
    /// Full health premium.
    pub health_premium: Decimal,
    /// Full pension premium.
    pub pension_premium: Decimal,
    /// Employer-borne dependent premiums.
    pub dependent_premium: Decimal,
    /// Health plus pension premium.
    pub total_premium: Decimal,
    /// Employer share.
    pub company_share: Decimal,
    /// Employee share for the month.
    pub employee_share: Decimal,
    /// Employee share deferred during unapproved leave.
    pub deferred_employee_share: Decimal,
    /// Deferred shares collected this month.
    pub carried_forward: Decimal,
    /// Corrections attached by other months' records.
    pub retroactive_adjustment: Decimal,
    /// Amount to withhold from the employee.
    pub employee_payable: Decimal,
}

impl ExportRow {
    /// Builds the row for a record with the given retroactive adjustment.
    pub fn from_record(record: &PremiumCalculation, retroactive_adjustment: Decimal) -> Self {
        let figures = &record.figures;
        let carried_forward = figures
            .postpaid
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.carried_forward_total);
        Self {
            employee_number: record.employee_number.clone(),
            period: record.period.to_string(),
            kind: record.kind,
            status: record.status,
            grade: figures.grade,
            pension_grade: figures.pension_grade,
            health_premium: figures.health_premium,
            pension_premium: figures.pension_premium,
            dependent_premium: figures.dependent_premium(),
            total_premium: figures.total_premium,
            company_share: figures.company_share,
            employee_share: figures.employee_share,
            deferred_employee_share: figures.deferred_employee_share(),
            carried_forward,
            retroactive_adjustment,
            employee_payable: figures.employee_payable() + retroactive_adjustment,
        }
    }
}

/// Sums the corrections that `sources` attach to `period`.
///
/// Only finalized source records contribute.
pub fn retroactive_adjustment(sources: &[PremiumCalculation], period: Period) -> Decimal {
    sources
        .iter()
        .filter(|source| source.status.is_finalized())
        .flat_map(|source| source.retroactive_deductions.iter())
        .filter(|deduction| deduction.target_months.contains(&period))
        .map(|deduction| deduction.amount)
        .sum()
}

/// Writes rows as CSV with a header line.
pub fn to_csv(rows: &[ExportRow]) -> EngineResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(|e| EngineError::ExportError {
            message: e.to_string(),
        })?;
    }
    let bytes = writer.into_inner().map_err(|e| EngineError::ExportError {
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| EngineError::ExportError {
        message: e.to_string(),
    })
}

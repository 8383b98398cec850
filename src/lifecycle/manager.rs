//! The calculation lifecycle manager.
//!
//! Orchestrates gathering, derivation and persistence of calculation
//! records, and enforces the `draft -> confirmed -> exported` lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::{InputSource, derive};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationInputs, CalculationKind, CalculationStatus, EmployeeInsuranceProfile, Period,
    PremiumCalculation, RECORD_SCHEMA_VERSION, RecalculationEntry, RecalculationMode,
    RetroactiveDeduction,
};
use crate::store::{Collaborators, DraftDelete, DraftUpsert, RecordWrite, same_slot};

use super::export::{ExportRow, retroactive_adjustment};
use super::gather::{Subject, ensure_eligible, gather_bonus, gather_monthly, load_subject};

/// An employee a bulk run did not calculate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEmployee {
    /// The employee id.
    pub employee_id: String,
    /// The employee number.
    pub employee_number: String,
    /// The stable error code.
    pub code: String,
    /// The user-facing reason.
    pub reason: String,
}

/// The result of a bulk run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    /// Records calculated (created or overwritten drafts).
    pub calculated: Vec<PremiumCalculation>,
    /// Employees skipped with the reason.
    pub skipped: Vec<SkippedEmployee>,
    /// The run stopped early because it was cancelled.
    pub cancelled: bool,
}

/// Runs calculations and moves records through their lifecycle.
#[derive(Clone)]
pub struct CalculationLifecycleManager {
    store: Arc<dyn Collaborators>,
}

impl CalculationLifecycleManager {
    /// Creates a manager over the given collaborators.
    pub fn new(store: Arc<dyn Collaborators>) -> Self {
        Self { store }
    }

    /// Returns the underlying collaborators.
    pub fn store(&self) -> &dyn Collaborators {
        self.store.as_ref()
    }

    /// Calculates the monthly premium for an employee, creating or
    /// overwriting the draft record.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyFinalized` when a confirmed or exported monthly
    /// record exists for the period, and with any gathering or derivation
    /// error.
    pub fn run_monthly(
        &self,
        employee_id: &str,
        period: Period,
        actor: &str,
    ) -> EngineResult<PremiumCalculation> {
        self.run(CalculationKind::Monthly, employee_id, period, actor)
    }

    /// Calculates the premium on the employee's bonus paid in `period`.
    pub fn run_bonus(
        &self,
        employee_id: &str,
        period: Period,
        actor: &str,
    ) -> EngineResult<PremiumCalculation> {
        self.run(CalculationKind::Bonus, employee_id, period, actor)
    }

    fn gather(
        &self,
        kind: CalculationKind,
        subject: &Subject,
        period: Period,
    ) -> EngineResult<CalculationInputs> {
        Ok(match kind {
            CalculationKind::Monthly => {
                CalculationInputs::Monthly(gather_monthly(self.store(), subject, period)?)
            }
            CalculationKind::Bonus => {
                CalculationInputs::Bonus(gather_bonus(self.store(), subject, period)?)
            }
        })
    }

    fn ensure_not_finalized(
        &self,
        employee: &EmployeeInsuranceProfile,
        kind: CalculationKind,
        period: Period,
    ) -> EngineResult<()> {
        let existing = self.store.query_by_employee(&employee.id, period)?;
        match existing
            .iter()
            .find(|r| same_slot(r, &employee.id, period, kind) && r.status.is_finalized())
        {
            Some(finalized) => Err(EngineError::AlreadyFinalized {
                employee_number: employee.employee_number.clone(),
                period,
                status: finalized.status,
            }),
            None => Ok(()),
        }
    }

    fn run(
        &self,
        kind: CalculationKind,
        employee_id: &str,
        period: Period,
        actor: &str,
    ) -> EngineResult<PremiumCalculation> {
        let subject = load_subject(self.store(), employee_id)?;
        let employee = &subject.employee;
        ensure_eligible(employee, period)?;
        self.ensure_not_finalized(employee, kind, period)?;

        let source = InputSource::Live(self.gather(kind, &subject, period)?);
        let outcome = derive(&source)?;

        let now = Utc::now();
        let draft = PremiumCalculation {
            id: Uuid::new_v4(),
            schema_version: RECORD_SCHEMA_VERSION,
            revision: 0,
            organization_id: subject.organization.id.clone(),
            employee_id: employee.id.clone(),
            employee_number: employee.employee_number.clone(),
            period,
            kind,
            status: CalculationStatus::Draft,
            figures: outcome.figures,
            bonus: outcome.bonus,
            notes: outcome.notes,
            recalculation_history: Vec::new(),
            retroactive_deductions: Vec::new(),
            inputs: source.into_owned(),
            audit_trace: outcome.audit_trace,
            created_at: now,
            calculated_by: actor.to_string(),
            calculated_at: now,
            confirmed_by: None,
            confirmed_at: None,
            exported_by: None,
            exported_at: None,
        };

        match self.store.upsert_draft(draft)? {
            DraftUpsert::Stored(record) => {
                info!(
                    calculation_id = %record.id,
                    employee_id = %record.employee_id,
                    period = %period,
                    kind = %kind,
                    total_premium = %record.figures.total_premium,
                    "Calculated premium draft"
                );
                Ok(record)
            }
            DraftUpsert::Finalized(existing) => Err(EngineError::AlreadyFinalized {
                employee_number: existing.employee_number,
                period,
                status: existing.status,
            }),
        }
    }

    /// Calculates monthly premiums for every eligible employee of the organization.
    ///
    /// Employees outside the calculable population or without a standard
    /// reward are left out; failures are collected as skips. The `cancel`
    /// flag is checked between employees.
    pub fn run_monthly_bulk(
        &self,
        organization_id: &str,
        period: Period,
        actor: &str,
        cancel: &AtomicBool,
    ) -> EngineResult<BulkOutcome> {
        let employees: Vec<EmployeeInsuranceProfile> = self
            .eligible_employees(organization_id, period)?
            .into_iter()
            .filter(|e| e.standard_reward.is_some())
            .collect();
        self.run_bulk(CalculationKind::Monthly, employees, period, actor, cancel)
    }

    /// Calculates bonus premiums for every eligible employee with a bonus in `period`.
    pub fn run_bonus_bulk(
        &self,
        organization_id: &str,
        period: Period,
        actor: &str,
        cancel: &AtomicBool,
    ) -> EngineResult<BulkOutcome> {
        let mut employees = Vec::new();
        for employee in self.eligible_employees(organization_id, period)? {
            if self.store.bonus(&employee.id, period)?.is_some() {
                employees.push(employee);
            }
        }
        self.run_bulk(CalculationKind::Bonus, employees, period, actor, cancel)
    }

    fn eligible_employees(
        &self,
        organization_id: &str,
        period: Period,
    ) -> EngineResult<Vec<EmployeeInsuranceProfile>> {
        Ok(self
            .store
            .list_employees(organization_id)?
            .into_iter()
            .filter(|e| ensure_eligible(e, period).is_ok())
            .collect())
    }

    fn run_bulk(
        &self,
        kind: CalculationKind,
        employees: Vec<EmployeeInsuranceProfile>,
        period: Period,
        actor: &str,
        cancel: &AtomicBool,
    ) -> EngineResult<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for employee in employees {
            if cancel.load(Ordering::Relaxed) {
                warn!(period = %period, kind = %kind, "Bulk calculation cancelled");
                outcome.cancelled = true;
                break;
            }

            match self.run(kind, &employee.id, period, actor) {
                Ok(record) => outcome.calculated.push(record),
                Err(error) => {
                    warn!(
                        employee_id = %employee.id,
                        period = %period,
                        code = error.code(),
                        error = %error,
                        "Skipped employee in bulk calculation"
                    );
                    outcome.skipped.push(SkippedEmployee {
                        employee_id: employee.id.clone(),
                        employee_number: employee.employee_number.clone(),
                        code: error.code().to_string(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            period = %period,
            kind = %kind,
            calculated = outcome.calculated.len(),
            skipped = outcome.skipped.len(),
            cancelled = outcome.cancelled,
            "Bulk calculation finished"
        );
        Ok(outcome)
    }

    /// Returns the record with the given id.
    pub fn get(&self, id: Uuid) -> EngineResult<PremiumCalculation> {
        self.store
            .get_calculation(id)?
            .ok_or(EngineError::RecordNotFound { id })
    }

    /// Applies `change` to the current copy of the record and writes it back.
    ///
    /// A concurrent write between the read and the write makes the store
    /// reject it; the change is then re-applied to the fresh copy, so status
    /// checks inside `change` always see what is stored.
    fn update<F>(&self, id: Uuid, mut change: F) -> EngineResult<PremiumCalculation>
    where
        F: FnMut(&mut PremiumCalculation) -> EngineResult<()>,
    {
        loop {
            let mut record = self.get(id)?;
            change(&mut record)?;
            match self.store.replace_calculation(record)? {
                RecordWrite::Written(stored) => return Ok(stored),
                RecordWrite::Missing => return Err(EngineError::RecordNotFound { id }),
                RecordWrite::Conflict(current) => {
                    debug!(
                        calculation_id = %id,
                        revision = current.revision,
                        status = %current.status,
                        "Record changed concurrently, retrying"
                    );
                }
            }
        }
    }

    /// Confirms a draft record.
    pub fn confirm(&self, id: Uuid, actor: &str) -> EngineResult<PremiumCalculation> {
        let record = self.update(id, |record| {
            if record.status != CalculationStatus::Draft {
                return Err(EngineError::InvalidStatusTransition {
                    id,
                    status: record.status,
                    action: "confirm".to_string(),
                });
            }
            record.status = CalculationStatus::Confirmed;
            record.confirmed_by = Some(actor.to_string());
            record.confirmed_at = Some(Utc::now());
            Ok(())
        })?;

        info!(calculation_id = %id, actor = %actor, "Confirmed calculation");
        Ok(record)
    }

    /// Marks a confirmed (or already exported) record as exported.
    pub fn mark_exported(&self, id: Uuid, actor: &str) -> EngineResult<PremiumCalculation> {
        let record = self.update(id, |record| {
            if !record.status.is_finalized() {
                return Err(EngineError::InvalidStatusTransition {
                    id,
                    status: record.status,
                    action: "export".to_string(),
                });
            }
            record.status = CalculationStatus::Exported;
            record.exported_by = Some(actor.to_string());
            record.exported_at = Some(Utc::now());
            Ok(())
        })?;

        info!(calculation_id = %id, actor = %actor, "Marked calculation exported");
        Ok(record)
    }

    /// Re-derives a record's figures in place.
    ///
    /// `Historical` uses the inputs frozen in the record; `Current` gathers
    /// them again from live master data. The previous figures and notes are
    /// appended to the recalculation history; status and stamps are kept.
    pub fn recalculate(
        &self,
        id: Uuid,
        mode: RecalculationMode,
        actor: &str,
        reason: Option<String>,
    ) -> EngineResult<PremiumCalculation> {
        let record = self.update(id, |record| {
            let source = match mode {
                RecalculationMode::Historical => InputSource::Frozen(&record.inputs),
                RecalculationMode::Current => {
                    let subject = load_subject(self.store(), &record.employee_id)?;
                    ensure_eligible(&subject.employee, record.period)?;
                    InputSource::Live(self.gather(record.kind, &subject, record.period)?)
                }
            };
            let outcome = derive(&source)?;
            let inputs = source.into_owned();

            let now = Utc::now();
            record.recalculation_history.push(RecalculationEntry {
                recalculated_at: now,
                recalculated_by: actor.to_string(),
                mode,
                reason: reason.clone(),
                previous: record.figures.clone(),
                previous_notes: record.notes.clone(),
            });
            record.figures = outcome.figures;
            record.bonus = outcome.bonus;
            record.notes = outcome.notes;
            record.audit_trace = outcome.audit_trace;
            record.inputs = inputs;
            record.calculated_by = actor.to_string();
            record.calculated_at = now;
            Ok(())
        })?;

        info!(
            calculation_id = %id,
            mode = ?mode,
            status = %record.status,
            history = record.recalculation_history.len(),
            "Recalculated premium"
        );
        Ok(record)
    }

    /// Attaches a premium-difference correction to other months.
    ///
    /// Only confirmed or exported records may carry corrections; the amount
    /// is added to the target months when they are exported.
    pub fn apply_retroactive_deduction(
        &self,
        id: Uuid,
        target_months: Vec<Period>,
        amount: Decimal,
        actor: &str,
    ) -> EngineResult<PremiumCalculation> {
        let deduction = RetroactiveDeduction {
            id: Uuid::new_v4(),
            target_months,
            amount,
            applied_by: actor.to_string(),
            applied_at: Utc::now(),
        };

        let record = self.update(id, |record| {
            if !record.status.is_finalized() {
                return Err(EngineError::InvalidStatusTransition {
                    id,
                    status: record.status,
                    action: "apply retroactive deduction to".to_string(),
                });
            }
            record.retroactive_deductions.push(deduction.clone());
            Ok(())
        })?;

        info!(
            calculation_id = %id,
            deduction_id = %deduction.id,
            amount = %amount,
            months = deduction.target_months.len(),
            "Applied retroactive deduction"
        );
        Ok(record)
    }

    /// Deletes a draft record.
    pub fn delete(&self, id: Uuid) -> EngineResult<()> {
        match self.store.delete_draft(id)? {
            DraftDelete::Deleted(_) => {
                info!(calculation_id = %id, "Deleted draft calculation");
                Ok(())
            }
            DraftDelete::Missing => Err(EngineError::RecordNotFound { id }),
            DraftDelete::Finalized(record) => Err(EngineError::AlreadyFinalized {
                employee_number: record.employee_number,
                period: record.period,
                status: record.status,
            }),
        }
    }

    /// Builds the export view of the organization's finalized records for a month.
    ///
    /// Drafts are never exported. Each row carries the corrections other
    /// months' records attach to this month.
    pub fn export(&self, organization_id: &str, period: Period) -> EngineResult<Vec<ExportRow>> {
        let mut records: Vec<PremiumCalculation> = self
            .store
            .query_by_period(organization_id, period)?
            .into_iter()
            .filter(|record| record.status.is_finalized())
            .collect();
        records.sort_by(|a, b| {
            a.employee_number
                .cmp(&b.employee_number)
                .then_with(|| kind_order(a.kind).cmp(&kind_order(b.kind)))
        });

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let adjustment = match record.kind {
                CalculationKind::Monthly => {
                    let sources = self.store.list_by_employee(&record.employee_id)?;
                    retroactive_adjustment(&sources, period)
                }
                CalculationKind::Bonus => Decimal::ZERO,
            };
            rows.push(ExportRow::from_record(record, adjustment));
        }
        Ok(rows)
    }
}

fn kind_order(kind: CalculationKind) -> u8 {
    match kind {
        CalculationKind::Monthly => 0,
        CalculationKind::Bonus => 1,
    }
}

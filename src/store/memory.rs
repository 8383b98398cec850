//! In-memory implementation of every collaborator port.
//!
//! Used by the server binary (seeded from configuration) and by tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::config::ConfigLoader;
use crate::error::EngineResult;
use crate::models::{
    CompensationRecord, EmployeeInsuranceProfile, OrganizationConfig, OtherCompanyCompensation,
    Period, PremiumCalculation, RateTableEntry,
};

use super::{
    CalculationStore, CompensationRecords, DraftDelete, DraftUpsert, EmployeeDirectory,
    OrganizationSettings, RateTableStore, RecordWrite, StoreError, StoreResult, same_slot,
};

type CompensationKey = (String, Period);

#[derive(Debug, Default)]
struct MasterData {
    employees: HashMap<String, EmployeeInsuranceProfile>,
    organizations: HashMap<String, OrganizationConfig>,
    rate_rows: Vec<RateTableEntry>,
    salaries: HashMap<CompensationKey, CompensationRecord>,
    bonuses: HashMap<CompensationKey, CompensationRecord>,
    other_salaries: HashMap<CompensationKey, Vec<OtherCompanyCompensation>>,
    other_bonuses: HashMap<CompensationKey, Vec<OtherCompanyCompensation>>,
}

#[derive(Debug, Default)]
struct Records {
    next_sequence: u64,
    by_id: HashMap<Uuid, (u64, PremiumCalculation)>,
}

impl Records {
    fn insert(&mut self, record: PremiumCalculation) {
        let sequence = match self.by_id.get(&record.id) {
            Some((sequence, _)) => *sequence,
            None => {
                self.next_sequence += 1;
                self.next_sequence
            }
        };
        self.by_id.insert(record.id, (sequence, record));
    }

    fn newest_first<F>(&self, predicate: F) -> Vec<PremiumCalculation>
    where
        F: Fn(&PremiumCalculation) -> bool,
    {
        let mut matching: Vec<&(u64, PremiumCalculation)> = self
            .by_id
            .values()
            .filter(|(_, record)| predicate(record))
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        matching.into_iter().map(|(_, record)| record.clone()).collect()
    }
}

/// A thread-safe store holding master data and calculation records in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    master: RwLock<MasterData>,
    records: RwLock<Records>,
}

fn poisoned<T>(error: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Poisoned(error.to_string())
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a loaded configuration.
    pub fn from_config(loader: &ConfigLoader) -> EngineResult<Self> {
        let store = Self::new();
        let config = loader.config();
        store.add_organization(config.organization().clone())?;
        store.add_rate_rows(config.rate_rows())?;
        for employee in config.employees() {
            store.add_employee(employee.clone())?;
        }

        let compensation = config.compensation();
        for entry in &compensation.salaries {
            store.set_monthly_salary(&entry.employee_id, entry.period()?, entry.to_record())?;
        }
        for entry in &compensation.bonuses {
            store.set_bonus(&entry.employee_id, entry.period()?, entry.to_record())?;
        }
        for entry in &compensation.other_company_salaries {
            store.add_other_company_salary(
                &entry.employee_id,
                entry.period()?,
                entry.to_other_company(),
            )?;
        }
        for entry in &compensation.other_company_bonuses {
            store.add_other_company_bonus(
                &entry.employee_id,
                entry.period()?,
                entry.to_other_company(),
            )?;
        }
        Ok(store)
    }

    fn master(&self) -> StoreResult<RwLockReadGuard<'_, MasterData>> {
        self.master.read().map_err(poisoned)
    }

    fn master_mut(&self) -> StoreResult<RwLockWriteGuard<'_, MasterData>> {
        self.master.write().map_err(poisoned)
    }

    fn records(&self) -> StoreResult<RwLockReadGuard<'_, Records>> {
        self.records.read().map_err(poisoned)
    }

    fn records_mut(&self) -> StoreResult<RwLockWriteGuard<'_, Records>> {
        self.records.write().map_err(poisoned)
    }

    /// Adds or replaces an employee.
    pub fn add_employee(&self, employee: EmployeeInsuranceProfile) -> StoreResult<()> {
        self.master_mut()?
            .employees
            .insert(employee.id.clone(), employee);
        Ok(())
    }

    /// Adds or replaces an organization's settings.
    pub fn add_organization(&self, organization: OrganizationConfig) -> StoreResult<()> {
        self.master_mut()?
            .organizations
            .insert(organization.id.clone(), organization);
        Ok(())
    }

    /// Appends rate table rows.
    pub fn add_rate_rows(&self, rows: impl IntoIterator<Item = RateTableEntry>) -> StoreResult<()> {
        self.master_mut()?.rate_rows.extend(rows);
        Ok(())
    }

    /// Sets the employee's salary for a month.
    pub fn set_monthly_salary(
        &self,
        employee_id: &str,
        period: Period,
        record: CompensationRecord,
    ) -> StoreResult<()> {
        self.master_mut()?
            .salaries
            .insert((employee_id.to_string(), period), record);
        Ok(())
    }

    /// Sets the employee's bonus for a month.
    pub fn set_bonus(
        &self,
        employee_id: &str,
        period: Period,
        record: CompensationRecord,
    ) -> StoreResult<()> {
        self.master_mut()?
            .bonuses
            .insert((employee_id.to_string(), period), record);
        Ok(())
    }

    /// Adds a salary reported by another employer.
    pub fn add_other_company_salary(
        &self,
        employee_id: &str,
        period: Period,
        compensation: OtherCompanyCompensation,
    ) -> StoreResult<()> {
        self.master_mut()?
            .other_salaries
            .entry((employee_id.to_string(), period))
            .or_default()
            .push(compensation);
        Ok(())
    }

    /// Adds a bonus reported by another employer.
    pub fn add_other_company_bonus(
        &self,
        employee_id: &str,
        period: Period,
        compensation: OtherCompanyCompensation,
    ) -> StoreResult<()> {
        self.master_mut()?
            .other_bonuses
            .entry((employee_id.to_string(), period))
            .or_default()
            .push(compensation);
        Ok(())
    }
}

impl EmployeeDirectory for InMemoryStore {
    fn get_employee(&self, employee_id: &str) -> StoreResult<Option<EmployeeInsuranceProfile>> {
        Ok(self.master()?.employees.get(employee_id).cloned())
    }

    fn list_employees(&self, organization_id: &str) -> StoreResult<Vec<EmployeeInsuranceProfile>> {
        let mut employees: Vec<EmployeeInsuranceProfile> = self
            .master()?
            .employees
            .values()
            .filter(|e| e.organization_id == organization_id)
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.employee_number.cmp(&b.employee_number));
        Ok(employees)
    }
}

impl RateTableStore for InMemoryStore {
    fn list_rate_tables(&self, organization_id: &str) -> StoreResult<Vec<RateTableEntry>> {
        Ok(self
            .master()?
            .rate_rows
            .iter()
            .filter(|row| row.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

impl CompensationRecords for InMemoryStore {
    fn monthly_salary(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Option<CompensationRecord>> {
        Ok(self
            .master()?
            .salaries
            .get(&(employee_id.to_string(), period))
            .cloned())
    }

    fn bonus(&self, employee_id: &str, period: Period) -> StoreResult<Option<CompensationRecord>> {
        Ok(self
            .master()?
            .bonuses
            .get(&(employee_id.to_string(), period))
            .cloned())
    }

    fn other_company_salaries(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<OtherCompanyCompensation>> {
        Ok(self
            .master()?
            .other_salaries
            .get(&(employee_id.to_string(), period))
            .cloned()
            .unwrap_or_default())
    }

    fn other_company_bonuses(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<OtherCompanyCompensation>> {
        Ok(self
            .master()?
            .other_bonuses
            .get(&(employee_id.to_string(), period))
            .cloned()
            .unwrap_or_default())
    }
}

impl OrganizationSettings for InMemoryStore {
    fn organization(&self, organization_id: &str) -> StoreResult<Option<OrganizationConfig>> {
        Ok(self.master()?.organizations.get(organization_id).cloned())
    }
}

impl CalculationStore for InMemoryStore {
    fn get_calculation(&self, id: Uuid) -> StoreResult<Option<PremiumCalculation>> {
        Ok(self
            .records()?
            .by_id
            .get(&id)
            .map(|(_, record)| record.clone()))
    }

    fn query_by_period(
        &self,
        organization_id: &str,
        period: Period,
    ) -> StoreResult<Vec<PremiumCalculation>> {
        Ok(self
            .records()?
            .newest_first(|r| r.organization_id == organization_id && r.period == period))
    }

    fn query_by_employee(
        &self,
        employee_id: &str,
        period: Period,
    ) -> StoreResult<Vec<PremiumCalculation>> {
        Ok(self
            .records()?
            .newest_first(|r| r.employee_id == employee_id && r.period == period))
    }

    fn list_by_employee(&self, employee_id: &str) -> StoreResult<Vec<PremiumCalculation>> {
        Ok(self.records()?.newest_first(|r| r.employee_id == employee_id))
    }

    fn upsert_draft(&self, mut draft: PremiumCalculation) -> StoreResult<DraftUpsert> {
        let mut records = self.records_mut()?;
        let existing = records
            .newest_first(|r| same_slot(r, &draft.employee_id, draft.period, draft.kind));

        if let Some(finalized) = existing.iter().find(|r| r.status.is_finalized()) {
            return Ok(DraftUpsert::Finalized(finalized.clone()));
        }

        let mut drafts = existing.into_iter();
        if let Some(previous) = drafts.next() {
            draft.id = previous.id;
            draft.created_at = previous.created_at;
            draft.revision = previous.revision + 1;
        }
        // Older duplicate drafts cannot coexist with the one kept.
        for stale in drafts {
            records.by_id.remove(&stale.id);
        }

        records.insert(draft.clone());
        Ok(DraftUpsert::Stored(draft))
    }

    fn replace_calculation(&self, mut record: PremiumCalculation) -> StoreResult<RecordWrite> {
        let mut records = self.records_mut()?;
        let current = match records.by_id.get(&record.id) {
            Some((_, current)) => current,
            None => return Ok(RecordWrite::Missing),
        };
        if current.revision != record.revision {
            return Ok(RecordWrite::Conflict(current.clone()));
        }

        record.revision += 1;
        records.insert(record.clone());
        Ok(RecordWrite::Written(record))
    }

    fn delete_draft(&self, id: Uuid) -> StoreResult<DraftDelete> {
        let mut records = self.records_mut()?;
        match records.by_id.get(&id) {
            None => Ok(DraftDelete::Missing),
            Some((_, record)) if record.status.is_finalized() => {
                Ok(DraftDelete::Finalized(record.clone()))
            }
            Some(_) => Ok(records
                .by_id
                .remove(&id)
                .map_or(DraftDelete::Missing, |(_, record)| DraftDelete::Deleted(record))),
        }
    }
}

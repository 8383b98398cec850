//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading an
//! organization's premium configuration from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::{OrganizationConfig, RateTableEntry};

use super::types::{CompensationFile, EmployeesFile, PremiumConfig, RateSchedule};

/// Loads and provides access to an organization's premium configuration.
///
/// # Directory Structure
///
/// ```text
/// config/sample_org/
/// ├── organization.yaml   # Organization id, name and leave collection method
/// ├── employees.yaml      # Optional employee master data
/// ├── compensation.yaml   # Optional salaries and bonuses
/// └── rates/
///     └── 2025-03-01.yaml # Rate schedule effective from this date
/// ```
///
/// # Example
///
/// ```no_run
/// use premium_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/sample_org")?;
/// println!("Loaded organization: {}", loader.organization().name);
/// # Ok::<(), premium_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: PremiumConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `organization.yaml` or the `rates` directory is
    /// missing, if any file contains invalid YAML, if a schedule's brackets
    /// overlap or leave a gap, or if two schedules share an effective month.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let organization = Self::load_yaml::<OrganizationConfig>(&path.join("organization.yaml"))?;
        let schedules = Self::load_rates(&path.join("rates"))?;
        let employees = Self::load_optional::<EmployeesFile>(&path.join("employees.yaml"))?;
        let compensation =
            Self::load_optional::<CompensationFile>(&path.join("compensation.yaml"))?;

        let config = PremiumConfig::new(organization, schedules, employees.employees, compensation);
        config.validate(&path.display().to_string())?;

        tracing::debug!(
            organization_id = %config.organization().id,
            schedules = config.schedules().len(),
            employees = config.employees().len(),
            "Loaded premium configuration"
        );

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads a YAML file, falling back to the default when it does not exist.
    fn load_optional<T: serde::de::DeserializeOwned + Default>(path: &Path) -> EngineResult<T> {
        if path.exists() {
            Self::load_yaml(path)
        } else {
            Ok(T::default())
        }
    }

    /// Loads all schedule files from the rates directory.
    fn load_rates(rates_dir: &Path) -> EngineResult<Vec<RateSchedule>> {
        let rates_dir_str = rates_dir.display().to_string();

        let entries = fs::read_dir(rates_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rates_dir_str.clone(),
        })?;

        let mut schedules = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rates_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                schedules.push(Self::load_yaml::<RateSchedule>(&path)?);
            }
        }

        if schedules.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rate files found)", rates_dir_str),
            });
        }

        Ok(schedules)
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &PremiumConfig {
        &self.config
    }

    /// Returns the organization settings.
    pub fn organization(&self) -> &OrganizationConfig {
        self.config.organization()
    }

    /// Returns every rate table row of every schedule.
    pub fn rate_rows(&self) -> Vec<RateTableEntry> {
        self.config.rate_rows()
    }
}

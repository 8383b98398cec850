//! Configuration loading and management for the Premium Engine.
//!
//! This module loads an organization's settings, premium rate schedules and
//! optional seed data from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use premium_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/sample_org").unwrap();
//! println!("Loaded organization: {}", config.organization().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CompensationEntry, CompensationFile, EmployeesFile, GradeBracket, PremiumConfig, RateSchedule,
};

//! Social-insurance premium engine.
//!
//! This crate calculates monthly and bonus health and pension insurance
//! premiums for employees, splits them between employee and employer, and
//! manages the calculation records through confirmation and export.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod store;

//! Calculation record lifecycle.
//!
//! Gathers live master data into frozen inputs, persists the derived
//! records and moves them through `draft -> confirmed -> exported`.

mod export;
mod gather;
mod manager;

pub use export::{ExportRow, retroactive_adjustment, to_csv};
pub use gather::{Subject, ensure_eligible, gather_bonus, gather_monthly, load_subject};
pub use manager::{BulkOutcome, CalculationLifecycleManager, SkippedEmployee};

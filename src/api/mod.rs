//! HTTP API module for the Premium Engine.
//!
//! This module provides the REST endpoints for running, reviewing and
//! exporting premium calculations.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ActorRequest, BulkCalculationRequest, CalculationRequest, PeriodRequest, RecalculateRequest,
    RetroactiveDeductionRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;

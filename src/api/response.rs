//! Response types for the Premium Engine API.
//!
//! This module defines the error response structures and the mapping from
//! engine errors to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a 400 response with the given body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::RecordNotFound { .. }
        | EngineError::EmployeeNotFound { .. }
        | EngineError::OrganizationNotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::AlreadyFinalized { .. } | EngineError::InvalidStatusTransition { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::MissingStandardReward { .. }
        | EngineError::RateTableNotFound { .. }
        | EngineError::GradeNotFound { .. }
        | EngineError::PensionGradeNotFound { .. }
        | EngineError::SalaryNotConfirmed { .. }
        | EngineError::BonusNotConfirmed { .. }
        | EngineError::OtherCompanyDataNotConfirmed { .. }
        | EngineError::EmployeeNotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::InvalidPeriod { .. } => StatusCode::BAD_REQUEST,
        EngineError::ConfigNotFound { .. }
        | EngineError::ConfigParseError { .. }
        | EngineError::ExportError { .. }
        | EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let status = status_for(&error);
        let body = match &error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiError::with_details(error.code(), "Configuration error", error.to_string())
            }
            EngineError::Store(_) => {
                ApiError::with_details(error.code(), "Storage failure", error.to_string())
            }
            _ => ApiError::new(error.code(), error.to_string()),
        };
        ApiErrorResponse {
            status,
            error: body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationStatus, Period};
    use crate::store::StoreError;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_already_finalized_maps_to_conflict() {
        let engine_error = EngineError::AlreadyFinalized {
            employee_number: "E001".to_string(),
            period: Period::new(2025, 4).unwrap(),
            status: CalculationStatus::Confirmed,
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(api_error.error.code, "ALREADY_FINALIZED");
        assert!(api_error.error.message.contains("E001"));
        assert!(api_error.error.message.contains("2025-04"));
    }

    #[test]
    fn test_missing_data_maps_to_unprocessable() {
        let engine_error = EngineError::BonusNotConfirmed {
            employee_number: "E002".to_string(),
            period: Period::new(2025, 6).unwrap(),
        };
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api_error.error.code, "BONUS_NOT_CONFIRMED");
    }

    #[test]
    fn test_store_failure_maps_to_internal_error() {
        let engine_error = EngineError::Store(StoreError::Poisoned("records".to_string()));
        let api_error: ApiErrorResponse = engine_error.into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error.code, "STORE_ERROR");
        assert!(api_error.error.details.is_some());
    }
}

//! HTTP request handlers for the Premium Engine API.
//!
//! This module contains the router and the handler functions for all API
//! endpoints. Handlers are thin: they parse the request, call the lifecycle
//! manager and map its errors to HTTP responses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::lifecycle::{BulkOutcome, to_csv};
use crate::models::{CalculationKind, Period};

use super::request::{
    ActorRequest, BulkCalculationRequest, CalculationRequest, RecalculateRequest,
    RetroactiveDeductionRequest,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculations/monthly", post(run_monthly_handler))
        .route("/calculations/monthly/bulk", post(run_monthly_bulk_handler))
        .route("/calculations/bonus", post(run_bonus_handler))
        .route("/calculations/bonus/bulk", post(run_bonus_bulk_handler))
        .route(
            "/calculations/:id",
            get(get_calculation_handler).delete(delete_calculation_handler),
        )
        .route("/calculations/:id/confirm", post(confirm_handler))
        .route("/calculations/:id/recalculate", post(recalculate_handler))
        .route("/calculations/:id/export", post(mark_exported_handler))
        .route(
            "/calculations/:id/retroactive-deductions",
            post(retroactive_deduction_handler),
        )
        .route(
            "/exports/:organization_id/:year/:month",
            get(export_csv_handler),
        )
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(correlation_id: Uuid, error: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        code = error.code(),
        error = %error,
        "Request failed"
    );
    ApiErrorResponse::from(error).into_response()
}

fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error).into_response())
}

fn parse_id(
    correlation_id: Uuid,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Uuid, Response> {
    path.map(|Path(id)| id).map_err(|rejection| {
        warn!(
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "Invalid calculation id"
        );
        ApiErrorResponse::bad_request(ApiError::with_details(
            "INVALID_ID",
            "Calculation id must be a UUID",
            rejection.body_text(),
        ))
        .into_response()
    })
}

async fn run_single(
    state: AppState,
    kind: CalculationKind,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, kind = %kind, "Processing calculation request");

    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let period = match request.period.to_period() {
        Ok(period) => period,
        Err(err) => return error_response(correlation_id, err),
    };

    let start_time = Instant::now();
    let manager = state.manager();
    let result = match kind {
        CalculationKind::Monthly => {
            manager.run_monthly(&request.employee_id, period, &request.actor)
        }
        CalculationKind::Bonus => manager.run_bonus(&request.employee_id, period, &request.actor),
    };

    match result {
        Ok(record) => {
            info!(
                correlation_id = %correlation_id,
                calculation_id = %record.id,
                employee_id = %record.employee_id,
                period = %period,
                total_premium = %record.figures.total_premium,
                duration_us = start_time.elapsed().as_micros(),
                "Calculation completed successfully"
            );
            json_response(StatusCode::OK, record)
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /calculations/monthly.
async fn run_monthly_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    run_single(state, CalculationKind::Monthly, payload).await
}

/// Handler for POST /calculations/bonus.
async fn run_bonus_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    run_single(state, CalculationKind::Bonus, payload).await
}

/// Raises the bulk run's cancel flag when dropped.
///
/// Axum drops the handler future when the client disconnects, which stops
/// the blocking run at the next employee.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

async fn run_bulk(
    state: AppState,
    kind: CalculationKind,
    payload: Result<Json<BulkCalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, kind = %kind, "Processing bulk calculation request");

    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let period = match request.period.to_period() {
        Ok(period) => period,
        Err(err) => return error_response(correlation_id, err),
    };

    // Bulk runs touch every employee; keep them off the async workers.
    let manager = state.manager().clone();
    let cancel = Arc::new(AtomicBool::new(false));
    let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancel));
    let joined = tokio::task::spawn_blocking(move || {
        match kind {
            CalculationKind::Monthly => manager.run_monthly_bulk(
                &request.organization_id,
                period,
                &request.actor,
                &cancel,
            ),
            CalculationKind::Bonus => manager.run_bonus_bulk(
                &request.organization_id,
                period,
                &request.actor,
                &cancel,
            ),
        }
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => json_response::<BulkOutcome>(StatusCode::OK, outcome),
        Ok(Err(err)) => error_response(correlation_id, err),
        Err(join_error) => {
            warn!(
                correlation_id = %correlation_id,
                error = %join_error,
                "Bulk calculation task failed"
            );
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Bulk calculation task failed"),
            )
        }
    }
}

/// Handler for POST /calculations/monthly/bulk.
async fn run_monthly_bulk_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkCalculationRequest>, JsonRejection>,
) -> Response {
    run_bulk(state, CalculationKind::Monthly, payload).await
}

/// Handler for POST /calculations/bonus/bulk.
async fn run_bonus_bulk_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkCalculationRequest>, JsonRejection>,
) -> Response {
    run_bulk(state, CalculationKind::Bonus, payload).await
}

/// Handler for GET /calculations/:id.
async fn get_calculation_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.manager().get(id) {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for DELETE /calculations/:id.
async fn delete_calculation_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.manager().delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /calculations/:id/confirm.
async fn confirm_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.manager().confirm(id, &request.actor) {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /calculations/:id/export.
async fn mark_exported_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ActorRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.manager().mark_exported(id, &request.actor) {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /calculations/:id/recalculate.
async fn recalculate_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RecalculateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state
        .manager()
        .recalculate(id, request.mode, &request.actor, request.reason)
    {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for POST /calculations/:id/retroactive-deductions.
async fn retroactive_deduction_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RetroactiveDeductionRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let id = match parse_id(correlation_id, path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let target_months = match request.periods() {
        Ok(periods) => periods,
        Err(err) => return error_response(correlation_id, err),
    };

    match state.manager().apply_retroactive_deduction(
        id,
        target_months,
        request.amount,
        &request.actor,
    ) {
        Ok(record) => json_response(StatusCode::OK, record),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for GET /exports/:organization_id/:year/:month.
///
/// Returns the finalized records of the month as CSV.
async fn export_csv_handler(
    State(state): State<AppState>,
    Path((organization_id, year, month)): Path<(String, i32, u32)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let period = match Period::new(year, month) {
        Ok(period) => period,
        Err(err) => return error_response(correlation_id, err),
    };

    let csv = state
        .manager()
        .export(&organization_id, period)
        .and_then(|rows| {
            info!(
                correlation_id = %correlation_id,
                organization_id = %organization_id,
                period = %period,
                rows = rows.len(),
                "Exporting calculations"
            );
            to_csv(&rows)
        });

    match csv {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => error_response(correlation_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::PremiumCalculation;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/sample_org").expect("Failed to load config");
        AppState::from_config(&config).expect("Failed to seed store")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_dropping_bulk_request_raises_cancel_flag() {
        let cancel = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Arc::clone(&cancel));
        assert!(!cancel.load(Ordering::Relaxed));
        drop(guard);
        assert!(cancel.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_monthly_calculation_returns_200() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(post_json(
                "/calculations/monthly",
                r#"{"employee_id": "emp_001", "year": 2025, "month": 4, "actor": "officer"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let record: PremiumCalculation = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.employee_number, "E001");
        assert_eq!(record.figures.total_premium, rust_decimal::Decimal::from(84630));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(post_json("/calculations/monthly", "{invalid json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_actor_returns_validation_error() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(post_json(
                "/calculations/monthly",
                r#"{"employee_id": "emp_001", "year": 2025, "month": 4}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("actor"));
    }

    #[tokio::test]
    async fn test_invalid_month_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(post_json(
                "/calculations/monthly",
                r#"{"employee_id": "emp_001", "year": 2025, "month": 13, "actor": "officer"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_PERIOD");
    }

    #[tokio::test]
    async fn test_unknown_record_returns_404() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/calculations/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_uuid_id_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/calculations/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_ID");
    }
}

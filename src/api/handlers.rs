//! HTTP request handlers for the finance API.
//!
//! Every handler tags its request with a correlation id, converts the body
//! or path into engine types, and maps [`FinanceError`]s to JSON error bodies.

use std::fmt::Display;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::FinanceEngine;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{
    AttendancePatch, Budget, Category, NewAttendance, TransactionDraft, TransactionFilter,
};

use super::request::{
    AttendanceRequest, DateQuery, PaymentQuery, PaymentRequest, RangeQuery, ReversalRequest,
    TransactionQuery,
};
use super::response::{ApiError, ApiErrorResponse, ThresholdResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/attendance", post(record_attendance_handler))
        .route("/attendance/summary", get(attendance_summary_handler))
        .route("/attendance/:id", patch(update_attendance_handler))
        .route(
            "/payments",
            post(compute_payment_handler).get(list_payments_handler),
        )
        .route("/payments/:id", get(get_payment_handler))
        .route("/payments/:id/clear", post(clear_payment_handler))
        .route("/payments/:id/cancel", post(cancel_payment_handler))
        .route(
            "/transactions",
            post(post_transaction_handler).get(query_transactions_handler),
        )
        .route("/transactions/:id", get(get_transaction_handler))
        .route("/transactions/:id/reverse", post(reverse_transaction_handler))
        .route("/summaries", get(summaries_handler))
        .route("/summaries/:date", get(daily_summary_handler))
        .route("/budgets", post(register_budget_handler))
        .route("/budgets/:category/adherence", get(adherence_handler))
        .route("/budgets/:category/threshold", get(threshold_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: ApiErrorResponse) -> Response {
    json_response(error.status, error.error)
}

/// Logs the outcome of an engine call and renders it.
fn respond<T: Serialize>(
    correlation_id: Uuid,
    operation: &'static str,
    status: StatusCode,
    result: FinanceResult<T>,
) -> Response {
    match result {
        Ok(body) => {
            info!(correlation_id = %correlation_id, operation, "Request completed");
            json_response(status, body)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                operation,
                kind = ?err.kind(),
                error = %err,
                "Request failed"
            );
            error_response(err.into())
        }
    }
}

/// Unwraps a JSON body or renders the rejection as a 400.
fn accept_json<T>(
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
    Err(error_response(ApiErrorResponse::bad_request(error)))
}

/// Unwraps a path or query extractor or renders the rejection as a 400.
fn accept<T, R: Display>(correlation_id: Uuid, extracted: Result<T, R>) -> Result<T, Response> {
    extracted.map_err(|rejection| {
        warn!(
            correlation_id = %correlation_id,
            error = %rejection,
            "Invalid request parameters"
        );
        error_response(ApiErrorResponse::bad_request(ApiError::validation_error(
            rejection.to_string(),
        )))
    })
}

/// Runs a mutating engine call on the blocking pool.
///
/// Journal writes sync to disk and sleep between retries while holding a
/// store lock, which must not stall the async workers.
async fn blocking<T, F>(state: &AppState, call: F) -> FinanceResult<T>
where
    F: FnOnce(&FinanceEngine) -> FinanceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let engine = state.shared_engine();
    match tokio::task::spawn_blocking(move || call(&engine)).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(FinanceError::Storage {
            attempts: 0,
            message: err.to_string(),
        }),
    }
}

macro_rules! accept_or_return {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(response) => return response,
        }
    };
}

/// Handler for POST /attendance.
async fn record_attendance_handler(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Recording attendance");

    let request = accept_or_return!(accept_json(correlation_id, payload));
    let result = match NewAttendance::try_from(request) {
        Ok(new) => blocking(&state, move |engine| engine.record_attendance(new)).await,
        Err(err) => Err(err),
    };
    respond(correlation_id, "record_attendance", StatusCode::CREATED, result)
}

/// Handler for PATCH /attendance/:id.
async fn update_attendance_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AttendancePatch>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));
    info!(correlation_id = %correlation_id, attendance_id = %id, "Updating attendance");

    let patch = accept_or_return!(accept_json(correlation_id, payload));
    let result = blocking(&state, move |engine| engine.update_attendance(id, patch)).await;
    respond(correlation_id, "update_attendance", StatusCode::OK, result)
}

/// Handler for GET /attendance/summary.
async fn attendance_summary_handler(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Query(range) = accept_or_return!(accept(correlation_id, query));

    let summary = state.engine().attendance_summary(range.into());
    respond(correlation_id, "attendance_summary", StatusCode::OK, Ok(summary))
}

/// Handler for POST /payments.
async fn compute_payment_handler(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Computing payment");

    let request = accept_or_return!(accept_json(correlation_id, payload));
    let result = blocking(&state, move |engine| {
        engine.compute_payment_by_name(
            &request.babysitter_id,
            request.date,
            &request.session_type,
            request.children_count,
        )
    })
    .await;
    respond(correlation_id, "compute_payment", StatusCode::CREATED, result)
}

/// Handler for GET /payments.
async fn list_payments_handler(
    State(state): State<AppState>,
    query: Result<Query<PaymentQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Query(query) = accept_or_return!(accept(correlation_id, query));

    let payments = state
        .engine()
        .payments(query.babysitter_id.as_deref(), query.status);
    respond(correlation_id, "list_payments", StatusCode::OK, Ok(payments))
}

/// Handler for GET /payments/:id.
async fn get_payment_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));

    respond(correlation_id, "get_payment", StatusCode::OK, state.engine().payment(id))
}

/// Handler for POST /payments/:id/clear.
async fn clear_payment_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));
    info!(correlation_id = %correlation_id, payment_id = %id, "Clearing payment");

    let result = blocking(&state, move |engine| engine.clear_payment(id)).await;
    respond(correlation_id, "clear_payment", StatusCode::OK, result)
}

/// Handler for POST /payments/:id/cancel.
async fn cancel_payment_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));
    info!(correlation_id = %correlation_id, payment_id = %id, "Cancelling payment");

    let result = blocking(&state, move |engine| engine.cancel_payment(id)).await;
    respond(correlation_id, "cancel_payment", StatusCode::OK, result)
}

/// Handler for POST /transactions.
async fn post_transaction_handler(
    State(state): State<AppState>,
    payload: Result<Json<TransactionDraft>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Posting transaction");

    let draft = accept_or_return!(accept_json(correlation_id, payload));
    let result = blocking(&state, move |engine| engine.post_transaction(draft)).await;
    respond(correlation_id, "post_transaction", StatusCode::CREATED, result)
}

/// Handler for GET /transactions.
async fn query_transactions_handler(
    State(state): State<AppState>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Query(query) = accept_or_return!(accept(correlation_id, query));

    let result = TransactionFilter::try_from(query)
        .map(|filter| state.engine().query_transactions(&filter));
    respond(correlation_id, "query_transactions", StatusCode::OK, result)
}

/// Handler for GET /transactions/:id.
async fn get_transaction_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));

    let result = state.engine().transaction(id);
    respond(correlation_id, "get_transaction", StatusCode::OK, result)
}

/// Handler for POST /transactions/:id/reverse.
async fn reverse_transaction_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReversalRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(id) = accept_or_return!(accept(correlation_id, id));
    info!(correlation_id = %correlation_id, transaction_id = %id, "Reversing transaction");

    let request = accept_or_return!(accept_json(correlation_id, payload));
    let result = blocking(&state, move |engine| {
        engine.reverse_transaction(id, request.description)
    })
    .await;
    respond(correlation_id, "reverse_transaction", StatusCode::CREATED, result)
}

/// Handler for GET /summaries/:date.
async fn daily_summary_handler(
    State(state): State<AppState>,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(date) = accept_or_return!(accept(correlation_id, date));

    let summary = state.engine().daily_summary(date);
    respond(correlation_id, "daily_summary", StatusCode::OK, Ok(summary))
}

/// Handler for GET /summaries.
async fn summaries_handler(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Query(range) = accept_or_return!(accept(correlation_id, query));

    let summaries = state.engine().summaries(range.into());
    respond(correlation_id, "summaries", StatusCode::OK, Ok(summaries))
}

/// Handler for POST /budgets.
async fn register_budget_handler(
    State(state): State<AppState>,
    payload: Result<Json<Budget>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Registering budget");

    let budget = accept_or_return!(accept_json(correlation_id, payload));
    let result = blocking(&state, move |engine| engine.register_budget(budget)).await;
    respond(correlation_id, "register_budget", StatusCode::CREATED, result)
}

/// Handler for GET /budgets/:category/adherence.
async fn adherence_handler(
    State(state): State<AppState>,
    category: Result<Path<String>, PathRejection>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(category) = accept_or_return!(accept(correlation_id, category));
    let Query(query) = accept_or_return!(accept(correlation_id, query));

    let engine = state.engine();
    let date = query.date.unwrap_or_else(|| engine.today());
    let result = category.parse::<Category>().and_then(|c| engine.budget_adherence(c, date));
    respond(correlation_id, "budget_adherence", StatusCode::OK, result)
}

/// Handler for GET /budgets/:category/threshold.
async fn threshold_handler(
    State(state): State<AppState>,
    category: Result<Path<String>, PathRejection>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let Path(category) = accept_or_return!(accept(correlation_id, category));
    let Query(query) = accept_or_return!(accept(correlation_id, query));

    let engine = state.engine();
    let date = query.date.unwrap_or_else(|| engine.today());
    let result = category.parse::<Category>().and_then(|category| {
        let over_threshold = engine.is_over_threshold(category, date)?;
        if over_threshold {
            warn!(
                correlation_id = %correlation_id,
                category = %category,
                date = %date,
                "Budget threshold reached"
            );
        }
        Ok::<_, FinanceError>(ThresholdResponse {
            category,
            date,
            over_threshold,
        })
    });
    respond(correlation_id, "budget_threshold", StatusCode::OK, result)
}

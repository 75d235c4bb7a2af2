//! Response types for the finance API.
//!
//! Errors are returned as `{code, message, details?}` with a status derived
//! from the error's [`ErrorKind`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, FinanceError};
use crate::models::Category;

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
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response.
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

/// HTTP status for an error class.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_code(error: &FinanceError) -> &'static str {
    match error {
        FinanceError::InvalidSessionType { .. } => "INVALID_SESSION_TYPE",
        FinanceError::InvalidCategory { .. } => "INVALID_CATEGORY",
        FinanceError::InvalidAmount { .. } => "INVALID_AMOUNT",
        FinanceError::InvalidChildrenCount { .. } => "INVALID_CHILDREN_COUNT",
        FinanceError::InvalidTimeRange { .. } => "INVALID_TIME_RANGE",
        FinanceError::InvalidBudget { .. } => "INVALID_BUDGET",
        FinanceError::InvalidQuery { .. } => "VALIDATION_ERROR",
        FinanceError::NoScheduleFound { .. } => "NO_SCHEDULE_FOUND",
        FinanceError::DuplicateSession { .. } => "DUPLICATE_SESSION",
        FinanceError::DuplicatePayment { .. } => "DUPLICATE_PAYMENT",
        FinanceError::AlreadyReversed { .. } => "ALREADY_REVERSED",
        FinanceError::InvalidTransition { .. } => "INVALID_TRANSITION",
        FinanceError::AmbiguousBudget { .. } => "AMBIGUOUS_BUDGET",
        FinanceError::BudgetMisconfigured { .. } => "BUDGET_MISCONFIGURED",
        FinanceError::NotFound { .. } => "NOT_FOUND",
        FinanceError::Storage { .. } => "STORAGE_UNAVAILABLE",
        FinanceError::ConfigNotFound { .. } | FinanceError::ConfigParseError { .. } => {
            "CONFIG_ERROR"
        }
    }
}

impl From<FinanceError> for ApiErrorResponse {
    fn from(error: FinanceError) -> Self {
        let status = status_for(error.kind());
        let code = error_code(&error);
        let error = match error.kind() {
            ErrorKind::Storage => ApiError::with_details(
                code,
                error.to_string(),
                "The operation was not applied and may be retried",
            ),
            ErrorKind::Config => {
                ApiError::with_details(code, "Configuration error", error.to_string())
            }
            _ => ApiError::new(code, error.to_string()),
        };
        ApiErrorResponse { status, error }
    }
}

/// Body of `GET /budgets/:category/threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdResponse {
    /// The evaluated category.
    pub category: Category,
    /// The evaluation date.
    pub date: NaiveDate,
    /// Whether usage has reached the budget's threshold.
    pub over_threshold: bool,
}

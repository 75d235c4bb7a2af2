//! HTTP API for the finance engine.
//!
//! A thin axum layer over [`crate::engine::FinanceEngine`]: handlers decode
//! requests, call one engine operation and encode the result.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    AttendanceRequest, DateQuery, PaymentQuery, PaymentRequest, RangeQuery, ReferenceKind,
    ReversalRequest, TransactionQuery,
};
pub use response::{ApiError, ApiErrorResponse, ThresholdResponse, status_for};
pub use state::AppState;

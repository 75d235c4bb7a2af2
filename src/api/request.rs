//! Request types for the finance API.
//!
//! Bodies that carry free-text enumerations (session type, category) are
//! converted with `TryFrom` so the engine's own validation errors reach the
//! caller.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::FinanceError;
use crate::models::{
    AttendanceStatus, DateRange, NewAttendance, PaymentStatus, Reference, TransactionFilter,
    TransactionType,
};

fn default_status() -> AttendanceStatus {
    AttendanceStatus::Present
}

/// Request body for `POST /attendance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRequest {
    /// The child checking in.
    pub child_id: String,
    /// The babysitter responsible for the session.
    pub babysitter_id: String,
    /// The session date.
    pub date: NaiveDate,
    /// `half-day` or `full-day`.
    pub session_type: String,
    /// Check-in time.
    pub check_in: NaiveDateTime,
    /// Check-out time, if already known.
    #[serde(default)]
    pub check_out: Option<NaiveDateTime>,
    /// Attendance status; defaults to present.
    #[serde(default = "default_status")]
    pub status: AttendanceStatus,
}

impl TryFrom<AttendanceRequest> for NewAttendance {
    type Error = FinanceError;

    fn try_from(req: AttendanceRequest) -> Result<Self, Self::Error> {
        Ok(NewAttendance {
            child_id: req.child_id,
            babysitter_id: req.babysitter_id,
            date: req.date,
            session_type: req.session_type.parse()?,
            check_in: req.check_in,
            check_out: req.check_out,
            status: req.status,
        })
    }
}

/// Request body for `POST /payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// The babysitter being paid.
    pub babysitter_id: String,
    /// The session date.
    pub date: NaiveDate,
    /// `half-day` or `full-day`.
    pub session_type: String,
    /// Number of children looked after.
    pub children_count: u32,
}

/// Request body for `POST /transactions/:id/reverse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReversalRequest {
    /// Why the transaction is being reversed.
    #[serde(default)]
    pub description: String,
}

/// Query string for `GET /payments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQuery {
    /// Only payments for this babysitter.
    #[serde(default)]
    pub babysitter_id: Option<String>,
    /// Only payments in this state.
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

/// An inclusive `start`/`end` query string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeQuery {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl From<RangeQuery> for DateRange {
    fn from(query: RangeQuery) -> Self {
        DateRange::new(query.start, query.end)
    }
}

/// An optional `date` query string; absent means today.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DateQuery {
    /// The evaluation date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Entity kind in a transaction reference filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// A child.
    #[serde(alias = "Child")]
    Child,
    /// A babysitter.
    #[serde(alias = "Babysitter")]
    Babysitter,
}

/// Query string for `GET /transactions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    /// First day; open-ended when absent.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Last day; open-ended when absent.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Category name.
    #[serde(default)]
    pub category: Option<String>,
    /// `income` or `expense`.
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Kind of the referenced entity. Requires `reference_id`.
    #[serde(default)]
    pub reference_kind: Option<ReferenceKind>,
    /// Id of the referenced entity. Requires `reference_kind`.
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = FinanceError;

    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        let date_range = match (query.start, query.end) {
            (None, None) => None,
            (start, end) => Some(DateRange::new(
                start.unwrap_or(NaiveDate::MIN),
                end.unwrap_or(NaiveDate::MAX),
            )),
        };
        let reference = match (query.reference_kind, query.reference_id) {
            (Some(ReferenceKind::Child), Some(id)) => Some(Reference::Child(id)),
            (Some(ReferenceKind::Babysitter), Some(id)) => Some(Reference::Babysitter(id)),
            (None, None) => None,
            _ => {
                return Err(FinanceError::InvalidQuery {
                    message: "reference_kind and reference_id must be given together".to_string(),
                });
            }
        };

        Ok(TransactionFilter {
            date_range,
            category: query.category.map(|c| c.parse()).transpose()?,
            transaction_type: query.transaction_type,
            reference,
        })
    }
}

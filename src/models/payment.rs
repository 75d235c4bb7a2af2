//! Babysitter payment records.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionType;

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Computed but not yet paid out.
    Pending,
    /// Paid out and booked in the ledger. Terminal.
    Cleared,
    /// Voided before being paid out. Terminal.
    Cancelled,
}

impl PaymentStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Cleared => "cleared",
            PaymentStatus::Cancelled => "cancelled",
        })
    }
}

/// An amount owed to a babysitter for one date and session.
///
/// The rate is frozen at computation time, so later rate table changes never
/// alter an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique identifier of the payment.
    pub id: Uuid,
    /// The babysitter being paid.
    pub babysitter_id: String,
    /// The session day.
    pub date: NaiveDate,
    /// The session length.
    pub session_type: SessionType,
    /// Number of children looked after.
    pub children_count: u32,
    /// Per-child rate used for the computation.
    pub rate: Decimal,
    /// `rate * children_count`, to two decimal places.
    pub amount: Decimal,
    /// Lifecycle state.
    pub status: PaymentStatus,
    /// When the payment was computed.
    pub created_at: DateTime<Utc>,
    /// When the payment was cleared or cancelled.
    #[serde(default)]
    pub settled_at: Option<DateTime<Utc>>,
    /// The ledger transaction posted on clearing.
    #[serde(default)]
    pub transaction_id: Option<Uuid>,
}

impl PaymentRecord {
    /// Returns true while the payment may still be cleared or cancelled.
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

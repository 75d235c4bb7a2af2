//! Core data models for the finance engine.
//!
//! These are plain data: the engine components in [`crate::finance`] own the
//! stores and enforce the invariants.

mod attendance;
mod budget;
mod date_range;
mod payment;
mod summary;
mod transaction;

pub use attendance::{
    AttendanceFact, AttendancePatch, AttendanceStatus, AttendanceSummary, NewAttendance,
    SessionType,
};
pub use budget::{Adherence, AdherenceReport, Budget, BudgetPeriod};
pub use date_range::DateRange;
pub use payment::{PaymentRecord, PaymentStatus};
pub use summary::DailySummary;
pub use transaction::{
    Category, Reference, Transaction, TransactionDraft, TransactionFilter, TransactionType,
};

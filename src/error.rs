//! Error types for the finance engine.
//!
//! Every operation returns [`FinanceError`]. Each variant belongs to one
//! [`ErrorKind`], which is what callers use to decide between surfacing,
//! correcting and retrying.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// The class of failure an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input. Never retried.
    Validation,
    /// The request clashes with existing state (duplicates, double transitions, ambiguity).
    Conflict,
    /// The referenced record does not exist.
    NotFound,
    /// The durable journal was unavailable after bounded retries.
    Storage,
    /// Configuration could not be loaded.
    Config,
}

/// The main error type for the finance engine.
///
/// # Example
///
/// ```
/// use daycare_finance::error::{ErrorKind, FinanceError};
///
/// let error = FinanceError::InvalidCategory {
///     category: "snacks".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid category: snacks");
/// assert_eq!(error.kind(), ErrorKind::Validation);
/// ```
#[derive(Debug, Error)]
pub enum FinanceError {
    /// The session type is not one of the rated tiers.
    #[error("Invalid session type: {session_type}")]
    InvalidSessionType {
        /// The rejected session type.
        session_type: String,
    },

    /// The category is not part of the closed category set.
    #[error("Invalid category: {category}")]
    InvalidCategory {
        /// The rejected category.
        category: String,
    },

    /// A monetary amount was zero, negative or otherwise unusable.
    #[error("Invalid amount {amount}: {message}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
        /// Why the amount was rejected.
        message: String,
    },

    /// A payment was requested for fewer than one child.
    #[error("Invalid children count {count}: must be at least 1")]
    InvalidChildrenCount {
        /// The rejected count.
        count: u32,
    },

    /// Check-out precedes check-in.
    #[error("Invalid time range for attendance '{id}': check-out precedes check-in")]
    InvalidTimeRange {
        /// The attendance fact being written.
        id: Uuid,
    },

    /// A budget definition failed validation.
    #[error("Invalid budget for '{category}': {message}")]
    InvalidBudget {
        /// The budget category.
        category: String,
        /// What made the budget invalid.
        message: String,
    },

    /// Query parameters are inconsistent with each other.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// What made the query invalid.
        message: String,
    },

    /// No attendance basis exists for the requested payment.
    #[error("No schedule found for babysitter '{babysitter_id}' on {date} ({session_type})")]
    NoScheduleFound {
        /// The babysitter being paid.
        babysitter_id: String,
        /// The session date.
        date: NaiveDate,
        /// The session type.
        session_type: String,
    },

    /// An attendance fact already exists for the child, date and session.
    #[error("Duplicate session for child '{child_id}' on {date} ({session_type})")]
    DuplicateSession {
        /// The child.
        child_id: String,
        /// The session date.
        date: NaiveDate,
        /// The session type.
        session_type: String,
    },

    /// A live payment already exists for the babysitter, date and session.
    #[error("Payment already exists for babysitter '{babysitter_id}' on {date} ({session_type})")]
    DuplicatePayment {
        /// The babysitter.
        babysitter_id: String,
        /// The session date.
        date: NaiveDate,
        /// The session type.
        session_type: String,
    },

    /// The transaction already has an offsetting correction.
    #[error("Transaction '{id}' has already been reversed")]
    AlreadyReversed {
        /// The original transaction.
        id: Uuid,
    },

    /// A payment lifecycle transition is not allowed from its current state.
    #[error("Invalid transition for payment '{id}': {from} -> {to}")]
    InvalidTransition {
        /// The payment.
        id: Uuid,
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },

    /// Covering budgets overlap without a single innermost one.
    #[error("Ambiguous budget for '{category}' on {date}: {count} budgets match")]
    AmbiguousBudget {
        /// The budget category.
        category: String,
        /// The evaluation date.
        date: NaiveDate,
        /// How many budgets matched.
        count: usize,
    },

    /// A zero-amount budget has recorded spending.
    #[error("Budget for '{category}' is misconfigured: {message}")]
    BudgetMisconfigured {
        /// The budget category.
        category: String,
        /// A description of the problem.
        message: String,
    },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The journal rejected a write after all retries.
    #[error("Storage error after {attempts} attempt(s): {message}")]
    Storage {
        /// How many writes were attempted.
        attempts: u32,
        /// The last underlying failure.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl FinanceError {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FinanceError::InvalidSessionType { .. }
            | FinanceError::InvalidCategory { .. }
            | FinanceError::InvalidAmount { .. }
            | FinanceError::InvalidChildrenCount { .. }
            | FinanceError::InvalidTimeRange { .. }
            | FinanceError::InvalidBudget { .. }
            | FinanceError::InvalidQuery { .. }
            | FinanceError::NoScheduleFound { .. } => ErrorKind::Validation,
            FinanceError::DuplicateSession { .. }
            | FinanceError::DuplicatePayment { .. }
            | FinanceError::InvalidTransition { .. }
            | FinanceError::AlreadyReversed { .. }
            | FinanceError::AmbiguousBudget { .. }
            | FinanceError::BudgetMisconfigured { .. } => ErrorKind::Conflict,
            FinanceError::NotFound { .. } => ErrorKind::NotFound,
            FinanceError::Storage { .. } => ErrorKind::Storage,
            FinanceError::ConfigNotFound { .. } | FinanceError::ConfigParseError { .. } => {
                ErrorKind::Config
            }
        }
    }

    /// Returns true if the failure may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FinanceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A type alias for Results that return FinanceError.
pub type FinanceResult<T> = Result<T, FinanceError>;

//! Finance engine components.
//!
//! Leaves first: the [`RateTable`] and [`AttendanceLedger`] depend on nothing,
//! the [`PaymentCalculator`] reads both, and the [`Ledger`] receives postings
//! from the [`PaymentLifecycle`] and direct callers. [`SummaryAggregator`] and
//! [`BudgetTracker`] derive their views from the ledger.
//!
//! Every component takes its collaborators explicitly; there is no global
//! ledger state.

pub mod attendance;
pub mod budget;
pub mod clock;
pub mod journal;
pub mod ledger;
pub mod lifecycle;
pub mod payment_calculator;
pub mod payment_store;
pub mod rate_table;
pub mod summary;

pub use attendance::AttendanceLedger;
pub use budget::BudgetTracker;
pub use clock::{Clock, FixedClock, SystemClock};
pub use journal::{
    FileJournal, Journal, JournalEntry, JournalError, JournalWriter, MemoryJournal, RetryPolicy,
};
pub use ledger::{Ledger, LedgerObserver, validate_amount};
pub use lifecycle::PaymentLifecycle;
pub use payment_calculator::{PaymentCalculator, payment_amount};
pub use payment_store::PaymentStore;
pub use rate_table::{DEFAULT_FULL_DAY_RATE, DEFAULT_HALF_DAY_RATE, RateTable};
pub use summary::{SummaryAggregator, SummaryCache};

//! The finance engine facade.
//!
//! [`FinanceEngine`] wires every component to one shared set of stores and
//! exposes the operations a request layer needs. It holds no state of its
//! own beyond those components.
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, NaiveDateTime};
//! use daycare_finance::engine::FinanceEngine;
//! use daycare_finance::models::{AttendanceStatus, NewAttendance, SessionType};
//! use rust_decimal::Decimal;
//!
//! let engine = FinanceEngine::builder().build()?;
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let check_in =
//!     NaiveDateTime::parse_from_str("2024-03-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
//!
//! engine.record_attendance(NewAttendance {
//!     child_id: "C1".to_string(),
//!     babysitter_id: "B1".to_string(),
//!     date,
//!     session_type: SessionType::FullDay,
//!     check_in,
//!     check_out: None,
//!     status: AttendanceStatus::Present,
//! })?;
//!
//! let payment = engine.compute_payment("B1", date, SessionType::FullDay, 2)?;
//! assert_eq!(payment.amount, Decimal::new(1000000, 2));
//!
//! engine.clear_payment(payment.id)?;
//! assert_eq!(engine.daily_summary(date).expenses, Decimal::new(1000000, 2));
//! # Ok::<(), daycare_finance::error::FinanceError>(())
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::config::ConfigLoader;
use crate::error::{FinanceError, FinanceResult};
use crate::finance::{
    AttendanceLedger, BudgetTracker, Clock, JournalWriter, Ledger, PaymentCalculator,
    PaymentLifecycle, PaymentStore, RateTable, SummaryAggregator, SystemClock,
};
use crate::models::{
    Adherence, AttendanceFact, AttendancePatch, AttendanceStatus, AttendanceSummary, Budget,
    Category, DailySummary, DateRange, NewAttendance, PaymentRecord, PaymentStatus, SessionType,
    Transaction, TransactionDraft, TransactionFilter,
};

/// All finance operations over one shared set of stores.
pub struct FinanceEngine {
    clock: Arc<dyn Clock>,
    attendance: Arc<AttendanceLedger>,
    payments: Arc<PaymentStore>,
    ledger: Arc<Ledger>,
    calculator: PaymentCalculator,
    lifecycle: PaymentLifecycle,
    summaries: SummaryAggregator,
    budgets: BudgetTracker,
}

impl FinanceEngine {
    /// Returns a builder with the seeded rates, an in-memory journal and the
    /// system clock.
    pub fn builder() -> FinanceEngineBuilder {
        FinanceEngineBuilder::default()
    }

    /// Builds an engine from a loaded configuration directory.
    pub fn from_config(config: &ConfigLoader) -> FinanceResult<Self> {
        FinanceEngine::builder()
            .rates(config.rate_table())
            .journal(config.open_journal()?)
            .budgets(config.budgets().to_vec())
            .build()
    }

    /// Records a check-in. See [`AttendanceLedger::record`].
    pub fn record_attendance(&self, new: NewAttendance) -> FinanceResult<AttendanceFact> {
        self.attendance.record(new)
    }

    /// Corrects an attendance fact. See [`AttendanceLedger::update`].
    pub fn update_attendance(
        &self,
        id: Uuid,
        patch: AttendancePatch,
    ) -> FinanceResult<AttendanceFact> {
        self.attendance.update(id, patch)
    }

    /// Counts sessions in `range`.
    pub fn attendance_summary(&self, range: DateRange) -> AttendanceSummary {
        self.attendance.summary(range)
    }

    /// Looks up an attendance fact.
    pub fn attendance(&self, id: Uuid) -> FinanceResult<AttendanceFact> {
        self.attendance
            .get(id)
            .ok_or_else(|| FinanceError::not_found("Attendance", id))
    }

    /// Prior versions of a corrected attendance fact, oldest first.
    pub fn attendance_history(&self, id: Uuid) -> Vec<AttendanceFact> {
        self.attendance.history(id)
    }

    /// The last status written for a child.
    pub fn current_status(&self, child_id: &str) -> Option<AttendanceStatus> {
        self.attendance.current_status(child_id)
    }

    /// Computes a pending payment. See [`PaymentCalculator::compute`].
    pub fn compute_payment(
        &self,
        babysitter_id: &str,
        date: NaiveDate,
        session_type: SessionType,
        children_count: u32,
    ) -> FinanceResult<PaymentRecord> {
        self.calculator
            .compute(babysitter_id, date, session_type, children_count)
    }

    /// Like [`FinanceEngine::compute_payment`], taking the session type by
    /// name. Unknown names fail with `InvalidSessionType`.
    pub fn compute_payment_by_name(
        &self,
        babysitter_id: &str,
        date: NaiveDate,
        session_type: &str,
        children_count: u32,
    ) -> FinanceResult<PaymentRecord> {
        self.compute_payment(babysitter_id, date, session_type.parse()?, children_count)
    }

    /// Clears a pending payment and posts its salary expense.
    pub fn clear_payment(&self, id: Uuid) -> FinanceResult<PaymentRecord> {
        self.lifecycle.clear(id)
    }

    /// Cancels a pending payment.
    pub fn cancel_payment(&self, id: Uuid) -> FinanceResult<PaymentRecord> {
        self.lifecycle.cancel(id)
    }

    /// Looks up a payment.
    pub fn payment(&self, id: Uuid) -> FinanceResult<PaymentRecord> {
        self.payments
            .get(id)
            .ok_or_else(|| FinanceError::not_found("Payment", id))
    }

    /// Payments filtered by babysitter and status.
    pub fn payments(
        &self,
        babysitter_id: Option<&str>,
        status: Option<PaymentStatus>,
    ) -> Vec<PaymentRecord> {
        self.payments.list(babysitter_id, status)
    }

    /// Posts a transaction to the ledger.
    pub fn post_transaction(&self, draft: TransactionDraft) -> FinanceResult<Transaction> {
        self.ledger.post(draft)
    }

    /// Transactions matching `filter`, by date then posting order.
    pub fn query_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.ledger.query(filter)
    }

    /// Posts the offsetting correction for a transaction.
    pub fn reverse_transaction(
        &self,
        id: Uuid,
        description: impl Into<String>,
    ) -> FinanceResult<Transaction> {
        self.ledger.reverse(id, description)
    }

    /// Looks up a transaction.
    pub fn transaction(&self, id: Uuid) -> FinanceResult<Transaction> {
        self.ledger
            .get(id)
            .ok_or_else(|| FinanceError::not_found("Transaction", id))
    }

    /// Income, expenses and net for one day, recomputed from the ledger.
    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        self.summaries.summary_for(date)
    }

    /// The incrementally maintained summary for one day.
    pub fn cached_summary(&self, date: NaiveDate) -> DailySummary {
        self.summaries.cached(date)
    }

    /// Refreshes the cached summary for one day from the ledger.
    pub fn recompute_summary(&self, date: NaiveDate) -> DailySummary {
        self.summaries.recompute(date)
    }

    /// Summaries for each day in `range` with activity.
    pub fn summaries(&self, range: DateRange) -> Vec<DailySummary> {
        self.summaries.range(range)
    }

    /// Registers a budget.
    pub fn register_budget(&self, budget: Budget) -> FinanceResult<Budget> {
        self.budgets.register(budget)
    }

    /// Budgets for one category.
    pub fn budgets_for(&self, category: Category) -> Vec<Budget> {
        self.budgets.budgets_for(category)
    }

    /// Overlapping budget pairs where neither range nests inside the other.
    pub fn budget_conflicts(&self) -> Vec<(Uuid, Uuid)> {
        self.budgets.conflicts()
    }

    /// Usage of the budget covering `category` on `date`.
    pub fn budget_adherence(
        &self,
        category: Category,
        date: NaiveDate,
    ) -> FinanceResult<Adherence> {
        self.budgets.adherence(category, date)
    }

    /// Returns true once the budget covering `category` on `date` reaches its threshold.
    pub fn is_over_threshold(&self, category: Category, date: NaiveDate) -> FinanceResult<bool> {
        self.budgets.is_over_threshold(category, date)
    }

    /// [`FinanceEngine::is_over_threshold`] as of the engine clock's today.
    pub fn is_over_threshold_today(&self, category: Category) -> FinanceResult<bool> {
        self.is_over_threshold(category, self.today())
    }

    /// Today according to the engine clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// The rate table used for new payments.
    pub fn rates(&self) -> RateTable {
        self.calculator.rates()
    }

    /// Replaces the rate table for new payments.
    pub fn set_rates(&self, rates: RateTable) {
        self.calculator.set_rates(rates);
    }
}

/// Builder for [`FinanceEngine`].
#[derive(Default)]
pub struct FinanceEngineBuilder {
    rates: RateTable,
    journal: Option<JournalWriter>,
    clock: Option<Arc<dyn Clock>>,
    budgets: Vec<Budget>,
}

impl FinanceEngineBuilder {
    /// Sets the rate table.
    pub fn rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    /// Sets the journal writer.
    pub fn journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Adds budgets to register when the engine is built.
    pub fn budgets(mut self, budgets: Vec<Budget>) -> Self {
        self.budgets.extend(budgets);
        self
    }

    /// Constructs the engine and registers the configured budgets.
    pub fn build(self) -> FinanceResult<FinanceEngine> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let journal = Arc::new(self.journal.unwrap_or_else(JournalWriter::in_memory));

        let attendance = Arc::new(AttendanceLedger::new(journal.clone()));
        let payments = Arc::new(PaymentStore::new());
        let ledger = Arc::new(Ledger::new(journal.clone(), clock.clone()));

        let engine = FinanceEngine {
            calculator: PaymentCalculator::new(
                attendance.clone(),
                payments.clone(),
                self.rates,
                journal.clone(),
                clock.clone(),
            ),
            lifecycle: PaymentLifecycle::new(
                payments.clone(),
                ledger.clone(),
                journal.clone(),
                clock.clone(),
            ),
            summaries: SummaryAggregator::new(ledger.clone()),
            budgets: BudgetTracker::new(ledger.clone(), journal),
            clock,
            attendance,
            payments,
            ledger,
        };

        for budget in self.budgets {
            engine.register_budget(budget)?;
        }

        info!(
            half_day = %self.rates.rate(SessionType::HalfDay),
            full_day = %self.rates.rate(SessionType::FullDay),
            "Finance engine ready"
        );
        Ok(engine)
    }
}

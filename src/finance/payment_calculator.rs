//! Babysitter payment computation.
//!
//! A payment is `rate(session_type) * children_count`, computed against the
//! rate table in force at computation time and frozen into the record.
//! Computing a payment posts nothing to the ledger; that happens when the
//! payment is cleared.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::attendance::AttendanceLedger;
use super::clock::Clock;
use super::journal::{JournalEntry, JournalWriter};
use super::payment_store::PaymentStore;
use super::rate_table::RateTable;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{PaymentRecord, PaymentStatus, SessionType};

/// Computes pending payments from attendance facts.
pub struct PaymentCalculator {
    attendance: Arc<AttendanceLedger>,
    payments: Arc<PaymentStore>,
    rates: RwLock<RateTable>,
    journal: Arc<JournalWriter>,
    clock: Arc<dyn Clock>,
}

impl PaymentCalculator {
    /// Creates a calculator over the given stores.
    pub fn new(
        attendance: Arc<AttendanceLedger>,
        payments: Arc<PaymentStore>,
        rates: RateTable,
        journal: Arc<JournalWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attendance,
            payments,
            rates: RwLock::new(rates),
            journal,
            clock,
        }
    }

    /// The rate table used for new computations.
    pub fn rates(&self) -> RateTable {
        *self.rates.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the rate table. Existing payments keep their frozen rate.
    pub fn set_rates(&self, rates: RateTable) {
        *self.rates.write().unwrap_or_else(PoisonError::into_inner) = rates;
        info!(
            half_day = %rates.rate(SessionType::HalfDay),
            full_day = %rates.rate(SessionType::FullDay),
            "Rate table updated"
        );
    }

    /// Computes and stores a pending payment.
    ///
    /// # Errors
    ///
    /// - `InvalidChildrenCount` if `children_count` is zero
    /// - `NoScheduleFound` if no attending child was recorded for the
    ///   babysitter, date and session type
    /// - `DuplicatePayment` if a pending or cleared payment already exists for
    ///   the same babysitter, date and session type
    pub fn compute(
        &self,
        babysitter_id: &str,
        date: NaiveDate,
        session_type: SessionType,
        children_count: u32,
    ) -> FinanceResult<PaymentRecord> {
        if children_count < 1 {
            return Err(FinanceError::InvalidChildrenCount {
                count: children_count,
            });
        }
        if !self.attendance.has_basis(babysitter_id, date, session_type) {
            warn!(
                babysitter_id,
                date = %date,
                session_type = %session_type,
                "No attendance basis for payment"
            );
            return Err(FinanceError::NoScheduleFound {
                babysitter_id: babysitter_id.to_string(),
                date,
                session_type: session_type.to_string(),
            });
        }

        let rate = self.rates().rate(session_type);
        let amount = payment_amount(rate, children_count);

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            babysitter_id: babysitter_id.to_string(),
            date,
            session_type,
            children_count,
            rate,
            amount,
            status: PaymentStatus::Pending,
            created_at: self.clock.now(),
            settled_at: None,
            transaction_id: None,
        };

        let record = self.payments.insert_pending(record, |record| {
            self.journal.record(&JournalEntry::PaymentComputed {
                payment: record.clone(),
            })
        })?;

        info!(
            payment_id = %record.id,
            babysitter_id = %record.babysitter_id,
            date = %record.date,
            session_type = %record.session_type,
            children_count = record.children_count,
            amount = %record.amount,
            "Payment computed"
        );
        Ok(record)
    }
}

/// `rate * children_count` to two decimal places.
pub fn payment_amount(rate: Decimal, children_count: u32) -> Decimal {
    (rate * Decimal::from(children_count)).round_dp(2)
}

//! Payment lifecycle: `pending -> cleared` and `pending -> cancelled`.
//!
//! Clearing posts exactly one `babysitter_salary` expense. The status change
//! and the posting are journaled as one entry and applied under the payment
//! store lock, so no reader ever sees a cleared payment without its
//! transaction, and a second clear fails instead of posting again.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::journal::{JournalEntry, JournalWriter};
use super::ledger::Ledger;
use super::payment_store::PaymentStore;
use crate::error::FinanceResult;
use crate::models::{
    Category, PaymentRecord, PaymentStatus, Reference, TransactionDraft, TransactionType,
};

/// Drives payments through their state machine.
pub struct PaymentLifecycle {
    payments: Arc<PaymentStore>,
    ledger: Arc<Ledger>,
    journal: Arc<JournalWriter>,
    clock: Arc<dyn Clock>,
}

impl PaymentLifecycle {
    /// Creates a lifecycle over the given stores.
    pub fn new(
        payments: Arc<PaymentStore>,
        ledger: Arc<Ledger>,
        journal: Arc<JournalWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            payments,
            ledger,
            journal,
            clock,
        }
    }

    /// Marks a pending payment as cleared and books the salary expense.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidTransition` if the
    /// payment is not pending.
    pub fn clear(&self, id: Uuid) -> FinanceResult<PaymentRecord> {
        let result = self.payments.transition(id, PaymentStatus::Cleared, |payment| {
            let mut cleared = payment.clone();
            cleared.status = PaymentStatus::Cleared;
            cleared.settled_at = Some(self.clock.now());

            let draft = TransactionDraft::new(
                payment.date,
                TransactionType::Expense,
                Category::BabysitterSalary.as_str(),
                payment.amount,
            )
            .with_description(format!(
                "Babysitter payment: {} session on {} ({} children)",
                payment.session_type, payment.date, payment.children_count
            ))
            .with_reference(Reference::Babysitter(payment.babysitter_id.clone()));

            self.ledger.post_with(draft, |transaction| {
                cleared.transaction_id = Some(transaction.id);
                self.journal.record(&JournalEntry::PaymentCleared {
                    payment: cleared.clone(),
                    transaction: transaction.clone(),
                })
            })?;
            Ok(cleared)
        });

        match &result {
            Ok(payment) => info!(
                payment_id = %payment.id,
                babysitter_id = %payment.babysitter_id,
                amount = %payment.amount,
                transaction_id = ?payment.transaction_id,
                "Payment cleared"
            ),
            Err(err) => warn!(payment_id = %id, error = %err, "Payment clear rejected"),
        }
        result
    }

    /// Cancels a pending payment. Nothing is posted to the ledger.
    ///
    /// Fails under the same conditions as [`PaymentLifecycle::clear`].
    pub fn cancel(&self, id: Uuid) -> FinanceResult<PaymentRecord> {
        let result = self.payments.transition(id, PaymentStatus::Cancelled, |payment| {
            let mut cancelled = payment.clone();
            cancelled.status = PaymentStatus::Cancelled;
            cancelled.settled_at = Some(self.clock.now());
            self.journal.record(&JournalEntry::PaymentCancelled {
                payment: cancelled.clone(),
            })?;
            Ok(cancelled)
        });

        match &result {
            Ok(payment) => info!(payment_id = %payment.id, "Payment cancelled"),
            Err(err) => warn!(payment_id = %id, error = %err, "Payment cancel rejected"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinanceError;
    use crate::finance::clock::SystemClock;
    use crate::finance::journal::tests::{FlakyJournal, fast_policy};
    use crate::models::{SessionType, TransactionFilter};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::Ordering;
    use std::thread;

    struct Fixture {
        payments: Arc<PaymentStore>,
        ledger: Arc<Ledger>,
        lifecycle: Arc<PaymentLifecycle>,
    }

    fn create_fixture(journal: Arc<JournalWriter>) -> Fixture {
        let payments = Arc::new(PaymentStore::new());
        let ledger = Arc::new(Ledger::new(journal.clone(), Arc::new(SystemClock)));
        let lifecycle = Arc::new(PaymentLifecycle::new(
            payments.clone(),
            ledger.clone(),
            journal,
            Arc::new(SystemClock),
        ));
        Fixture {
            payments,
            ledger,
            lifecycle,
        }
    }

    fn insert_pending(payments: &PaymentStore) -> PaymentRecord {
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            babysitter_id: "B1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            session_type: SessionType::FullDay,
            children_count: 2,
            rate: Decimal::new(500000, 2),
            amount: Decimal::new(1000000, 2),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            settled_at: None,
            transaction_id: None,
        };
        payments.insert_pending(record, |_| Ok(())).unwrap()
    }

    fn salary_postings(ledger: &Ledger) -> usize {
        ledger
            .query(&TransactionFilter {
                category: Some(Category::BabysitterSalary),
                ..TransactionFilter::default()
            })
            .len()
    }

    #[test]
    fn test_clear_posts_salary_expense() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        let payment = insert_pending(&fixture.payments);

        let cleared = fixture.lifecycle.clear(payment.id).unwrap();
        assert_eq!(cleared.status, PaymentStatus::Cleared);
        assert!(cleared.settled_at.is_some());

        let tx = fixture.ledger.get(cleared.transaction_id.unwrap()).unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.category, Category::BabysitterSalary);
        assert_eq!(tx.amount, payment.amount);
        assert_eq!(tx.reference, Some(Reference::Babysitter("B1".to_string())));
        assert_eq!(fixture.payments.get(payment.id), Some(cleared));
    }

    #[test]
    fn test_second_clear_is_rejected_without_reposting() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        let payment = insert_pending(&fixture.payments);

        fixture.lifecycle.clear(payment.id).unwrap();
        let second = fixture.lifecycle.clear(payment.id);

        assert!(matches!(
            second,
            Err(FinanceError::InvalidTransition { .. })
        ));
        assert_eq!(salary_postings(&fixture.ledger), 1);
    }

    #[test]
    fn test_concurrent_clears_post_once() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        let id = insert_pending(&fixture.payments).id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = Arc::clone(&fixture.lifecycle);
                thread::spawn(move || lifecycle.clear(id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, FinanceError::InvalidTransition { .. }))
        );
        assert_eq!(salary_postings(&fixture.ledger), 1);
    }

    #[test]
    fn test_cancel_posts_nothing_and_is_terminal() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        let payment = insert_pending(&fixture.payments);

        let cancelled = fixture.lifecycle.cancel(payment.id).unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert!(fixture.ledger.is_empty());

        assert!(matches!(
            fixture.lifecycle.clear(payment.id),
            Err(FinanceError::InvalidTransition { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.cancel(payment.id),
            Err(FinanceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cleared_payment_cannot_be_cancelled() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        let payment = insert_pending(&fixture.payments);

        fixture.lifecycle.clear(payment.id).unwrap();
        assert!(matches!(
            fixture.lifecycle.cancel(payment.id),
            Err(FinanceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_unknown_payment_is_not_found() {
        let fixture = create_fixture(Arc::new(JournalWriter::in_memory()));
        assert!(matches!(
            fixture.lifecycle.clear(Uuid::new_v4()),
            Err(FinanceError::NotFound { .. })
        ));
        assert!(matches!(
            fixture.lifecycle.cancel(Uuid::new_v4()),
            Err(FinanceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_storage_failure_keeps_payment_pending_and_ledger_empty() {
        let journal = Arc::new(FlakyJournal::failing(0));
        let fixture = create_fixture(Arc::new(JournalWriter::new(journal.clone(), fast_policy(2))));
        let payment = insert_pending(&fixture.payments);

        journal.failures.store(10, Ordering::SeqCst);
        let result = fixture.lifecycle.clear(payment.id);

        assert!(matches!(result, Err(FinanceError::Storage { .. })));
        assert!(fixture.ledger.is_empty());
        assert_eq!(
            fixture.payments.get(payment.id).map(|p| p.status),
            Some(PaymentStatus::Pending)
        );

        journal.failures.store(0, Ordering::SeqCst);
        let cleared = fixture.lifecycle.clear(payment.id).unwrap();
        assert_eq!(cleared.status, PaymentStatus::Cleared);
        assert_eq!(salary_postings(&fixture.ledger), 1);
    }
}

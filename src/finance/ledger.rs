//! The append-only financial ledger.
//!
//! Transactions are validated, journaled and appended. There is no update or
//! delete: corrections are new offsetting transactions posted through
//! [`Ledger::reverse`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::journal::{JournalEntry, JournalWriter};
use crate::error::{FinanceError, FinanceResult};
use crate::models::{Category, Transaction, TransactionDraft, TransactionFilter};

/// Receives every transaction appended to a [`Ledger`].
///
/// Observers are called while the ledger's write lock is held, so they see
/// postings in ledger order and must not call back into the ledger.
pub trait LedgerObserver: Send + Sync {
    /// Called once per appended transaction.
    fn on_post(&self, transaction: &Transaction);
}

#[derive(Default)]
struct LedgerBook {
    transactions: Vec<Transaction>,
    by_id: HashMap<Uuid, usize>,
    reversed: HashMap<Uuid, Uuid>,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl LedgerBook {
    fn append(&mut self, transaction: Transaction) {
        if let Some(original) = transaction.reverses {
            self.reversed.insert(original, transaction.id);
        }
        self.by_id.insert(transaction.id, self.transactions.len());
        for observer in &self.observers {
            observer.on_post(&transaction);
        }
        self.transactions.push(transaction);
    }
}

/// Append-only store of income and expense transactions.
pub struct Ledger {
    book: RwLock<LedgerBook>,
    journal: Arc<JournalWriter>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new(journal: Arc<JournalWriter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            book: RwLock::new(LedgerBook::default()),
            journal,
            clock,
        }
    }

    /// Registers an observer. Transactions already in the ledger are replayed
    /// to it first, so it never misses a posting.
    pub fn subscribe(&self, observer: Arc<dyn LedgerObserver>) {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        for transaction in &book.transactions {
            observer.on_post(transaction);
        }
        book.observers.push(observer);
    }

    /// Validates and appends a transaction.
    ///
    /// Fails with `InvalidCategory` for categories outside [`Category`] and
    /// `InvalidAmount` for amounts that are not strictly positive or carry
    /// more than two decimal places.
    pub fn post(&self, draft: TransactionDraft) -> FinanceResult<Transaction> {
        self.post_with(draft, |transaction| {
            self.journal.record(&JournalEntry::TransactionPosted {
                transaction: transaction.clone(),
            })
        })
    }

    /// Validates a draft and appends it once `persist` succeeds.
    ///
    /// `persist` runs under the ledger's write lock with the final
    /// transaction, and is responsible for making it durable. If it fails the
    /// ledger is left unchanged.
    pub(crate) fn post_with<F>(
        &self,
        draft: TransactionDraft,
        persist: F,
    ) -> FinanceResult<Transaction>
    where
        F: FnOnce(&Transaction) -> FinanceResult<()>,
    {
        let transaction = self.prepare(draft, None)?;
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        persist(&transaction)?;
        book.append(transaction.clone());
        drop(book);

        info!(
            transaction_id = %transaction.id,
            date = %transaction.date,
            transaction_type = ?transaction.transaction_type,
            category = %transaction.category,
            amount = %transaction.amount,
            "Transaction posted"
        );
        Ok(transaction)
    }

    /// Posts an offsetting transaction for `id`: same amount, category and
    /// reference, opposite type. A transaction can be reversed only once.
    pub fn reverse(&self, id: Uuid, description: impl Into<String>) -> FinanceResult<Transaction> {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        let original = book
            .by_id
            .get(&id)
            .map(|&idx| book.transactions[idx].clone())
            .ok_or_else(|| FinanceError::not_found("Transaction", id))?;
        if book.reversed.contains_key(&id) {
            warn!(transaction_id = %id, "Rejected second reversal");
            return Err(FinanceError::AlreadyReversed { id });
        }

        let draft = TransactionDraft {
            date: original.date,
            transaction_type: original.transaction_type.opposite(),
            category: original.category.to_string(),
            amount: original.amount,
            description: description.into(),
            reference: original.reference.clone(),
        };
        let reversal = self.prepare(draft, Some(id))?;
        self.journal.record(&JournalEntry::TransactionPosted {
            transaction: reversal.clone(),
        })?;
        book.append(reversal.clone());
        drop(book);

        info!(
            transaction_id = %reversal.id,
            reverses = %id,
            amount = %reversal.amount,
            "Transaction reversed"
        );
        Ok(reversal)
    }

    /// Transactions matching `filter`, ordered by date with ties in posting order.
    pub fn query(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<Transaction> = book
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matches.sort_by_key(|t| t.date);
        matches
    }

    /// Runs `f` over all transactions in posting order while holding the read lock.
    pub(crate) fn with_transactions<R>(&self, f: impl FnOnce(&[Transaction]) -> R) -> R {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        f(&book.transactions)
    }

    /// Looks up a transaction by id.
    pub fn get(&self, id: Uuid) -> Option<Transaction> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        book.by_id.get(&id).map(|&idx| book.transactions[idx].clone())
    }

    /// Number of stored transactions.
    pub fn len(&self) -> usize {
        self.book
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .transactions
            .len()
    }

    /// Returns true if nothing has been posted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prepare(
        &self,
        draft: TransactionDraft,
        reverses: Option<Uuid>,
    ) -> FinanceResult<Transaction> {
        let category: Category = draft.category.parse()?;
        validate_amount(draft.amount)?;

        Ok(Transaction {
            id: Uuid::new_v4(),
            date: draft.date,
            transaction_type: draft.transaction_type,
            category,
            amount: draft.amount.round_dp(2),
            description: draft.description,
            reference: draft.reference,
            reverses,
            recorded_at: self.clock.now(),
        })
    }
}

/// Checks that `amount` is strictly positive with at most two decimal places.
pub fn validate_amount(amount: Decimal) -> FinanceResult<()> {
    if amount <= Decimal::ZERO {
        return Err(FinanceError::InvalidAmount {
            amount,
            message: "must be greater than zero".to_string(),
        });
    }
    if amount.normalize().scale() > 2 {
        return Err(FinanceError::InvalidAmount {
            amount,
            message: "must not have more than two decimal places".to_string(),
        });
    }
    Ok(())
}

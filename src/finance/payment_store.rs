//! Storage for payment records shared by the calculator and the lifecycle.
//!
//! A payment key (babysitter, date, session type) may have at most one live
//! (pending or cleared) payment. Inserts and transitions are serialized by a
//! single lock, which makes the uniqueness check atomic with the insert and
//! every transition at-most-once.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{FinanceError, FinanceResult};
use crate::models::{PaymentRecord, PaymentStatus, SessionType};

type PaymentKey = (String, NaiveDate, SessionType);

fn key_of(record: &PaymentRecord) -> PaymentKey {
    (record.babysitter_id.clone(), record.date, record.session_type)
}

#[derive(Debug, Default)]
struct PaymentBook {
    records: Vec<PaymentRecord>,
    by_id: HashMap<Uuid, usize>,
    live: HashMap<PaymentKey, Uuid>,
}

/// The set of payment records.
#[derive(Debug, Default)]
pub struct PaymentStore {
    book: Mutex<PaymentBook>,
}

impl PaymentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending record unless its key already has a live payment.
    ///
    /// `persist` runs under the store lock after the uniqueness check and
    /// before the insert; if it fails nothing is stored.
    pub(crate) fn insert_pending<F>(
        &self,
        record: PaymentRecord,
        persist: F,
    ) -> FinanceResult<PaymentRecord>
    where
        F: FnOnce(&PaymentRecord) -> FinanceResult<()>,
    {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let key = key_of(&record);
        if book.live.contains_key(&key) {
            return Err(FinanceError::DuplicatePayment {
                babysitter_id: record.babysitter_id,
                date: record.date,
                session_type: record.session_type.to_string(),
            });
        }

        persist(&record)?;

        let idx = book.records.len();
        book.by_id.insert(record.id, idx);
        book.live.insert(key, record.id);
        book.records.push(record.clone());
        Ok(record)
    }

    /// Moves a pending payment to `to`.
    ///
    /// `apply` receives the current record and returns the updated one; it
    /// runs under the store lock, so concurrent transitions on the same
    /// payment observe each other. Fails with `NotFound` for unknown ids and
    /// `InvalidTransition` when the payment is no longer pending.
    pub(crate) fn transition<F>(
        &self,
        id: Uuid,
        to: PaymentStatus,
        apply: F,
    ) -> FinanceResult<PaymentRecord>
    where
        F: FnOnce(&PaymentRecord) -> FinanceResult<PaymentRecord>,
    {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let &idx = book
            .by_id
            .get(&id)
            .ok_or_else(|| FinanceError::not_found("Payment", id))?;

        let current = &book.records[idx];
        if current.status != PaymentStatus::Pending {
            return Err(FinanceError::InvalidTransition {
                id,
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        let updated = apply(current)?;
        if updated.status == PaymentStatus::Cancelled {
            book.live.remove(&key_of(&updated));
        }
        book.records[idx] = updated.clone();
        Ok(updated)
    }

    /// Looks up a payment by id.
    pub fn get(&self, id: Uuid) -> Option<PaymentRecord> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.by_id.get(&id).map(|&idx| book.records[idx].clone())
    }

    /// Payments matching the optional babysitter and status, in creation order.
    pub fn list(
        &self,
        babysitter_id: Option<&str>,
        status: Option<PaymentStatus>,
    ) -> Vec<PaymentRecord> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.records
            .iter()
            .filter(|p| babysitter_id.is_none_or(|b| p.babysitter_id == b))
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect()
    }
}

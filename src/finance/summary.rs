//! Daily income/expense summaries derived from the ledger.
//!
//! [`SummaryAggregator::summary_for`] always recomputes from the ledger and
//! is the source of truth. The aggregator also keeps an incrementally updated
//! cache fed by ledger postings; both paths must always agree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tracing::debug;

use super::ledger::{Ledger, LedgerObserver};
use crate::models::{DailySummary, DateRange, Transaction, TransactionFilter};

/// Per-day summaries updated in O(1) per posting.
#[derive(Debug, Default)]
pub struct SummaryCache {
    days: Mutex<HashMap<NaiveDate, DailySummary>>,
}

impl SummaryCache {
    fn get(&self, date: NaiveDate) -> DailySummary {
        self.days
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DailySummary::empty(date))
    }

    fn replace(&self, summary: DailySummary) {
        self.days
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(summary.date, summary);
    }
}

impl LedgerObserver for SummaryCache {
    fn on_post(&self, transaction: &Transaction) {
        self.days
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(transaction.date)
            .or_insert_with(|| DailySummary::empty(transaction.date))
            .apply(transaction);
    }
}

/// Derives daily summaries from a [`Ledger`].
pub struct SummaryAggregator {
    ledger: Arc<Ledger>,
    cache: Arc<SummaryCache>,
}

impl SummaryAggregator {
    /// Creates an aggregator and subscribes its cache to `ledger`.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        let cache = Arc::new(SummaryCache::default());
        ledger.subscribe(cache.clone());
        Self { ledger, cache }
    }

    /// Recomputes the summary for `date` from the ledger.
    pub fn summary_for(&self, date: NaiveDate) -> DailySummary {
        let transactions = self.ledger.query(&TransactionFilter::on(date));
        let summary = DailySummary::from_transactions(date, &transactions);
        debug!(
            date = %date,
            transactions = summary.transaction_ids.len(),
            net = %summary.net,
            "Daily summary recomputed"
        );
        summary
    }

    /// The incrementally maintained summary for `date`.
    pub fn cached(&self, date: NaiveDate) -> DailySummary {
        self.cache.get(date)
    }

    /// Recomputes `date` and replaces the cached value with the result.
    ///
    /// Runs under the ledger's read lock so no posting can interleave between
    /// the recompute and the cache write. Recomputing twice yields the same
    /// summary.
    pub fn recompute(&self, date: NaiveDate) -> DailySummary {
        self.ledger.with_transactions(|transactions| {
            let summary = DailySummary::from_transactions(
                date,
                transactions.iter().filter(|t| t.date == date),
            );
            self.cache.replace(summary.clone());
            summary
        })
    }

    /// Summaries for every day in `range` that has at least one transaction.
    pub fn range(&self, range: DateRange) -> Vec<DailySummary> {
        let transactions = self.ledger.query(&TransactionFilter {
            date_range: Some(range),
            ..TransactionFilter::default()
        });

        let mut summaries: Vec<DailySummary> = Vec::new();
        for transaction in &transactions {
            match summaries.last_mut() {
                Some(summary) if summary.date == transaction.date => summary.apply(transaction),
                _ => {
                    let mut summary = DailySummary::empty(transaction.date);
                    summary.apply(transaction);
                    summaries.push(summary);
                }
            }
        }
        summaries
    }
}

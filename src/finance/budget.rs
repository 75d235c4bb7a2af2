//! Budget adherence tracking.
//!
//! A budget caps expenses in one category over a date range. Budgets of a
//! category may overlap only by nesting: when several cover a date, the one
//! with the innermost range wins (a March budget inside a 2024 one). Any other
//! overlap is a configuration error: registration reports it, and adherence
//! refuses to pick a budget where it applies.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::journal::{JournalEntry, JournalWriter};
use super::ledger::Ledger;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{
    Adherence, AdherenceReport, Budget, Category, Transaction, TransactionFilter, TransactionType,
};

/// Evaluates budgets against ledger expenses.
pub struct BudgetTracker {
    ledger: Arc<Ledger>,
    budgets: RwLock<Vec<Budget>>,
    journal: Arc<JournalWriter>,
}

impl BudgetTracker {
    /// Creates a tracker with no budgets.
    pub fn new(ledger: Arc<Ledger>, journal: Arc<JournalWriter>) -> Self {
        Self {
            ledger,
            budgets: RwLock::new(Vec::new()),
            journal,
        }
    }

    /// Validates and stores a budget.
    ///
    /// Overlaps with an existing budget of the same category that are not
    /// strict nestings are accepted but logged, and listed by [`BudgetTracker::conflicts`].
    pub fn register(&self, budget: Budget) -> FinanceResult<Budget> {
        budget.validate()?;

        let mut budgets = self.budgets.write().unwrap_or_else(PoisonError::into_inner);
        for existing in budgets.iter().filter(|b| b.conflicts_with(&budget)) {
            warn!(
                category = %budget.category,
                budget_id = %budget.id,
                conflicts_with = %existing.id,
                "Overlapping budgets that do not nest"
            );
        }

        self.journal.record(&JournalEntry::BudgetRegistered {
            budget: budget.clone(),
        })?;
        budgets.push(budget.clone());

        info!(
            budget_id = %budget.id,
            category = %budget.category,
            amount = %budget.amount,
            start_date = %budget.start_date,
            end_date = %budget.end_date,
            "Budget registered"
        );
        Ok(budget)
    }

    /// Budgets for `category`, in registration order.
    pub fn budgets_for(&self, category: Category) -> Vec<Budget> {
        self.budgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|b| b.category == category)
            .cloned()
            .collect()
    }

    /// Pairs of budget ids that overlap without one nesting inside the other.
    pub fn conflicts(&self) -> Vec<(Uuid, Uuid)> {
        let budgets = self.budgets.read().unwrap_or_else(PoisonError::into_inner);
        let mut pairs = Vec::new();
        for (i, a) in budgets.iter().enumerate() {
            for b in budgets.iter().skip(i + 1) {
                if a.conflicts_with(b) {
                    pairs.push((a.id, b.id));
                }
            }
        }
        pairs
    }

    /// The budget that governs `category` on `date`, if any.
    ///
    /// Fails with `AmbiguousBudget` when no single covering budget sits
    /// inside all the others.
    pub fn applicable(&self, category: Category, date: NaiveDate) -> FinanceResult<Option<Budget>> {
        let budgets = self.budgets.read().unwrap_or_else(PoisonError::into_inner);
        let covering: Vec<&Budget> = budgets
            .iter()
            .filter(|b| b.category == category && b.covers(date))
            .collect();
        if covering.is_empty() {
            return Ok(None);
        }

        let innermost = |budget: &&Budget| {
            covering.iter().all(|other| {
                other.id == budget.id || other.range().strictly_contains(&budget.range())
            })
        };
        let candidates: Vec<&Budget> = covering.iter().copied().filter(innermost).collect();
        if let [budget] = candidates.as_slice() {
            return Ok(Some((*budget).clone()));
        }

        warn!(
            category = %category,
            date = %date,
            count = covering.len(),
            "Ambiguous budget"
        );
        Err(FinanceError::AmbiguousBudget {
            category: category.to_string(),
            date,
            count: covering.len(),
        })
    }

    /// Reports usage of the budget governing `category` on `as_of`.
    ///
    /// Spent is the sum of expenses in the category over the budget's whole
    /// range, less any reversals of those expenses. Reversing a reversal
    /// counts the expense again. Returns
    /// [`Adherence::NotApplicable`] when no budget covers the date.
    pub fn adherence(&self, category: Category, as_of: NaiveDate) -> FinanceResult<Adherence> {
        let Some(budget) = self.applicable(category, as_of)? else {
            return Ok(Adherence::NotApplicable);
        };

        let spent = self.spent(&budget);
        let percentage_used = if budget.amount.is_zero() {
            if !spent.is_zero() {
                return Err(FinanceError::BudgetMisconfigured {
                    category: category.to_string(),
                    message: format!("zero budget with {} spent", spent),
                });
            }
            Decimal::ZERO
        } else {
            (spent / budget.amount * Decimal::ONE_HUNDRED).round_dp(2)
        };

        Ok(Adherence::Applicable(AdherenceReport {
            budget_id: budget.id,
            category,
            budget: budget.amount,
            spent,
            remaining: budget.amount - spent,
            percentage_used,
            threshold_percent: budget.threshold_percent,
            is_over_budget: spent > budget.amount,
        }))
    }

    /// Returns true when usage has reached the budget's alert threshold.
    ///
    /// Dates without a budget are never over threshold.
    pub fn is_over_threshold(&self, category: Category, as_of: NaiveDate) -> FinanceResult<bool> {
        Ok(self
            .adherence(category, as_of)?
            .report()
            .is_some_and(AdherenceReport::is_over_threshold))
    }

    fn spent(&self, budget: &Budget) -> Decimal {
        let filter = TransactionFilter {
            date_range: Some(budget.range()),
            category: Some(budget.category),
            ..TransactionFilter::default()
        };
        let transactions = self.ledger.query(&filter);
        let by_id: HashMap<Uuid, &Transaction> = transactions.iter().map(|t| (t.id, t)).collect();

        // A reversal keeps the date and category of what it reverses, so every
        // chain lies within the query. Only chains starting at an expense count.
        let root_type = |transaction: &Transaction| {
            let mut current = transaction;
            while let Some(original) = current.reverses.and_then(|id| by_id.get(&id).copied()) {
                current = original;
            }
            current.transaction_type
        };

        transactions
            .iter()
            .filter(|t| root_type(*t) == TransactionType::Expense)
            .map(|t| match t.transaction_type {
                TransactionType::Expense => t.amount,
                TransactionType::Income => -t.amount,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::clock::SystemClock;
    use crate::models::{BudgetPeriod, TransactionDraft};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn create_tracker() -> (Arc<Ledger>, BudgetTracker) {
        let journal = Arc::new(JournalWriter::in_memory());
        let ledger = Arc::new(Ledger::new(journal.clone(), Arc::new(SystemClock)));
        let tracker = BudgetTracker::new(ledger.clone(), journal);
        (ledger, tracker)
    }

    fn budget(period: BudgetPeriod, start: &str, end: &str, amount: &str) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            category: Category::Utilities,
            amount: dec(amount),
            period,
            start_date: make_date(start),
            end_date: make_date(end),
            threshold_percent: dec("80"),
        }
    }

    fn spend(ledger: &Ledger, date: &str, amount: &str) {
        ledger
            .post(TransactionDraft::new(
                make_date(date),
                TransactionType::Expense,
                "utilities",
                dec(amount),
            ))
            .unwrap();
    }

    #[test]
    fn test_utilities_over_threshold() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        spend(&ledger, "2024-03-02", "500");
        spend(&ledger, "2024-03-20", "350");
        spend(&ledger, "2024-04-01", "999");

        let as_of = make_date("2024-03-15");
        let adherence = tracker.adherence(Category::Utilities, as_of).unwrap();
        let report = adherence.report().unwrap();

        assert_eq!(report.budget, dec("1000"));
        assert_eq!(report.spent, dec("850"));
        assert_eq!(report.remaining, dec("150"));
        assert_eq!(report.percentage_used, dec("85"));
        assert!(!report.is_over_budget);
        assert!(tracker.is_over_threshold(Category::Utilities, as_of).unwrap());
    }

    #[test]
    fn test_income_and_other_categories_do_not_count() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        spend(&ledger, "2024-03-02", "100");
        ledger
            .post(TransactionDraft::new(
                make_date("2024-03-02"),
                TransactionType::Expense,
                "maintenance",
                dec("700"),
            ))
            .unwrap();
        ledger
            .post(TransactionDraft::new(
                make_date("2024-03-02"),
                TransactionType::Income,
                "utilities",
                dec("50"),
            ))
            .unwrap();

        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        assert_eq!(adherence.report().unwrap().spent, dec("100"));
    }

    #[test]
    fn test_reversed_expense_is_not_spent() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        spend(&ledger, "2024-03-02", "100");
        let mistake = ledger
            .post(TransactionDraft::new(
                make_date("2024-03-03"),
                TransactionType::Expense,
                "utilities",
                dec("400"),
            ))
            .unwrap();
        ledger.reverse(mistake.id, "Duplicate invoice").unwrap();

        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        assert_eq!(adherence.report().unwrap().spent, dec("100"));
    }

    #[test]
    fn test_no_budget_is_not_applicable() {
        let (_ledger, tracker) = create_tracker();
        let date = make_date("2024-03-10");
        assert_eq!(
            tracker.adherence(Category::Utilities, date).unwrap(),
            Adherence::NotApplicable
        );
        assert!(!tracker.is_over_threshold(Category::Utilities, date).unwrap());
    }

    #[test]
    fn test_partial_overlap_is_ambiguous() {
        let (_ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-10", "2024-04-09", "800"))
            .unwrap();

        assert_eq!(tracker.conflicts().len(), 1);
        match tracker.adherence(Category::Utilities, make_date("2024-03-15")) {
            Err(FinanceError::AmbiguousBudget { count, .. }) => assert_eq!(count, 2),
            other => panic!("Expected AmbiguousBudget, got {:?}", other),
        }
        // Outside the overlap only one budget applies.
        assert!(
            tracker
                .adherence(Category::Utilities, make_date("2024-03-05"))
                .is_ok()
        );
    }

    #[test]
    fn test_nested_budget_prefers_innermost_range() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Yearly, "2024-01-01", "2024-12-31", "12000"))
            .unwrap();
        let monthly = tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        spend(&ledger, "2024-03-02", "250");

        assert!(tracker.conflicts().is_empty());
        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        let report = adherence.report().unwrap();
        assert_eq!(report.budget_id, monthly.id);
        assert_eq!(report.percentage_used, dec("25"));
    }

    #[test]
    fn test_innermost_range_wins_over_period_label() {
        let (_ledger, tracker) = create_tracker();
        let monthly = tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        tracker
            .register(budget(BudgetPeriod::Weekly, "2024-02-01", "2024-04-30", "5000"))
            .unwrap();

        assert!(tracker.conflicts().is_empty());
        let applicable = tracker
            .applicable(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        assert_eq!(applicable.map(|b| b.id), Some(monthly.id));
    }

    #[test]
    fn test_partial_overlap_with_different_periods_conflicts() {
        let (_ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        tracker
            .register(budget(BudgetPeriod::Yearly, "2024-03-15", "2025-03-14", "12000"))
            .unwrap();

        assert_eq!(tracker.conflicts().len(), 1);
        assert!(matches!(
            tracker.applicable(Category::Utilities, make_date("2024-03-20")),
            Err(FinanceError::AmbiguousBudget { .. })
        ));
        assert!(
            tracker
                .applicable(Category::Utilities, make_date("2024-03-05"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_threshold_is_not_reached_just_below() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        spend(&ledger, "2024-03-02", "799.99");
        let date = make_date("2024-03-10");

        let adherence = tracker.adherence(Category::Utilities, date).unwrap();
        assert_eq!(adherence.report().unwrap().percentage_used, dec("80.00"));
        assert!(!tracker.is_over_threshold(Category::Utilities, date).unwrap());

        spend(&ledger, "2024-03-03", "0.01");
        assert!(tracker.is_over_threshold(Category::Utilities, date).unwrap());
    }

    #[test]
    fn test_reversing_a_reversal_counts_the_expense_again() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        let expense = ledger
            .post(TransactionDraft::new(
                make_date("2024-03-03"),
                TransactionType::Expense,
                "utilities",
                dec("400"),
            ))
            .unwrap();
        let reversal = ledger.reverse(expense.id, "Wrong invoice").unwrap();
        ledger.reverse(reversal.id, "Invoice was right").unwrap();

        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        assert_eq!(adherence.report().unwrap().spent, dec("400"));
    }

    #[test]
    fn test_reversed_income_is_not_spent() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "1000"))
            .unwrap();
        let refund = ledger
            .post(TransactionDraft::new(
                make_date("2024-03-03"),
                TransactionType::Income,
                "utilities",
                dec("50"),
            ))
            .unwrap();
        ledger.reverse(refund.id, "Refund bounced").unwrap();

        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        assert_eq!(adherence.report().unwrap().spent, Decimal::ZERO);
    }

    #[test]
    fn test_zero_budget() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "0"))
            .unwrap();
        let date = make_date("2024-03-10");

        let adherence = tracker.adherence(Category::Utilities, date).unwrap();
        assert_eq!(adherence.report().unwrap().percentage_used, Decimal::ZERO);

        spend(&ledger, "2024-03-02", "1");
        assert!(matches!(
            tracker.adherence(Category::Utilities, date),
            Err(FinanceError::BudgetMisconfigured { .. })
        ));
    }

    #[test]
    fn test_over_budget() {
        let (ledger, tracker) = create_tracker();
        tracker
            .register(budget(BudgetPeriod::Monthly, "2024-03-01", "2024-03-31", "100"))
            .unwrap();
        spend(&ledger, "2024-03-02", "150");

        let adherence = tracker
            .adherence(Category::Utilities, make_date("2024-03-10"))
            .unwrap();
        let report = adherence.report().unwrap();
        assert!(report.is_over_budget);
        assert_eq!(report.remaining, dec("-50"));
        assert_eq!(report.percentage_used, dec("150"));
    }

    #[test]
    fn test_invalid_budget_is_rejected() {
        let (_ledger, tracker) = create_tracker();
        let result = tracker.register(budget(
            BudgetPeriod::Monthly,
            "2024-03-31",
            "2024-03-01",
            "100",
        ));
        assert!(matches!(result, Err(FinanceError::InvalidBudget { .. })));
        assert!(tracker.budgets_for(Category::Utilities).is_empty());
    }
}

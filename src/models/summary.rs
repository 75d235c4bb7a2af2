//! Daily financial summaries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Transaction, TransactionType};

/// Income, expenses and net for one calendar day.
///
/// Summaries are derived data and can always be rebuilt from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// The summarized day.
    pub date: NaiveDate,
    /// Total income.
    pub income: Decimal,
    /// Total expenses.
    pub expenses: Decimal,
    /// `income - expenses`.
    pub net: Decimal,
    /// Contributing transactions in ledger order.
    pub transaction_ids: Vec<Uuid>,
}

impl DailySummary {
    /// A summary with no activity.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            net: Decimal::ZERO,
            transaction_ids: Vec::new(),
        }
    }

    /// Folds one transaction into the summary. Transactions for other days are ignored.
    pub fn apply(&mut self, transaction: &Transaction) {
        if transaction.date != self.date {
            return;
        }
        match transaction.transaction_type {
            TransactionType::Income => self.income += transaction.amount,
            TransactionType::Expense => self.expenses += transaction.amount,
        }
        self.net = self.income - self.expenses;
        self.transaction_ids.push(transaction.id);
    }

    /// Builds a summary for `date` from a sequence of transactions.
    pub fn from_transactions<'a>(
        date: NaiveDate,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Self {
        let mut summary = Self::empty(date);
        for transaction in transactions {
            summary.apply(transaction);
        }
        summary
    }

    /// Returns true if no transaction contributed.
    pub fn is_empty(&self) -> bool {
        self.transaction_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn make_transaction(
        date: NaiveDate,
        transaction_type: TransactionType,
        amount: &str,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            date,
            transaction_type,
            category: Category::Other,
            amount: dec(amount),
            description: String::new(),
            reference: None,
            reverses: None,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_net_is_income_minus_expenses() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let transactions = vec![
            make_transaction(date, TransactionType::Income, "0.10"),
            make_transaction(date, TransactionType::Income, "0.20"),
            make_transaction(date, TransactionType::Expense, "0.30"),
        ];

        let summary = DailySummary::from_transactions(date, &transactions);
        assert_eq!(summary.income, dec("0.30"));
        assert_eq!(summary.expenses, dec("0.30"));
        assert_eq!(summary.net, Decimal::ZERO);
        assert_eq!(summary.transaction_ids.len(), 3);
    }

    #[test]
    fn test_other_days_are_ignored() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let transactions = vec![make_transaction(next, TransactionType::Income, "50.00")];

        let summary = DailySummary::from_transactions(date, &transactions);
        assert!(summary.is_empty());
        assert_eq!(summary, DailySummary::empty(date));
    }
}

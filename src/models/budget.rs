//! Budgets and budget adherence reports.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, DateRange};
use crate::error::{FinanceError, FinanceResult};

/// The cadence a budget is planned over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    /// One day.
    Daily,
    /// One week.
    Weekly,
    /// One month.
    Monthly,
    /// One year.
    Yearly,
}

/// A spending cap for one category over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier of the budget.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// The expense category being capped.
    pub category: Category,
    /// The cap.
    pub amount: Decimal,
    /// Planning cadence.
    pub period: BudgetPeriod,
    /// First day covered (inclusive).
    pub start_date: NaiveDate,
    /// Last day covered (inclusive).
    pub end_date: NaiveDate,
    /// Usage percentage at which alerts fire, between 0 and 100.
    pub threshold_percent: Decimal,
}

impl Budget {
    /// The covered days.
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Returns true if this budget applies on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.range().contains(date)
    }

    /// Returns true if both budgets cap the same category over shared days
    /// without one range strictly nesting inside the other. Such pairs cannot
    /// be resolved automatically.
    pub fn conflicts_with(&self, other: &Budget) -> bool {
        let (mine, theirs) = (self.range(), other.range());
        self.id != other.id
            && self.category == other.category
            && mine.overlaps(&theirs)
            && !mine.strictly_contains(&theirs)
            && !theirs.strictly_contains(&mine)
    }

    /// Checks the structural invariants of a budget.
    pub fn validate(&self) -> FinanceResult<()> {
        let invalid = |message: &str| FinanceError::InvalidBudget {
            category: self.category.to_string(),
            message: message.to_string(),
        };

        if self.start_date >= self.end_date {
            return Err(invalid("start_date must be before end_date"));
        }
        if self.amount < Decimal::ZERO {
            return Err(invalid("amount must not be negative"));
        }
        if self.threshold_percent < Decimal::ZERO || self.threshold_percent > Decimal::ONE_HUNDRED
        {
            return Err(invalid("threshold_percent must be between 0 and 100"));
        }
        Ok(())
    }
}

/// Usage of a budget as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceReport {
    /// The evaluated budget.
    pub budget_id: Uuid,
    /// The budget category.
    pub category: Category,
    /// The cap.
    pub budget: Decimal,
    /// Expenses booked in the budget's range.
    pub spent: Decimal,
    /// `budget - spent`; negative when over budget.
    pub remaining: Decimal,
    /// `spent / budget * 100`, to two decimal places.
    pub percentage_used: Decimal,
    /// The alert threshold.
    pub threshold_percent: Decimal,
    /// Whether spending exceeds the cap.
    pub is_over_budget: bool,
}

impl AdherenceReport {
    /// Returns true once usage reaches the alert threshold.
    ///
    /// Decided on the exact ratio; `percentage_used` is rounded for display
    /// and would let 79.999% pass an 80% threshold.
    pub fn is_over_threshold(&self) -> bool {
        if self.budget.is_zero() {
            return self.percentage_used >= self.threshold_percent;
        }
        self.spent * Decimal::ONE_HUNDRED >= self.threshold_percent * self.budget
    }
}

/// Result of an adherence query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Adherence {
    /// A budget covers the date.
    Applicable(AdherenceReport),
    /// No budget covers the date.
    NotApplicable,
}

impl Adherence {
    /// Returns the report when a budget applies.
    pub fn report(&self) -> Option<&AdherenceReport> {
        match self {
            Adherence::Applicable(report) => Some(report),
            Adherence::NotApplicable => None,
        }
    }
}

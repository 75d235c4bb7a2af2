//! Ledger transactions and their filters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DateRange;
use crate::error::FinanceError;

/// Direction of a transaction. The amount itself is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money received.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionType {
    /// The opposite direction, used for offsetting corrections.
    pub fn opposite(&self) -> Self {
        match self {
            TransactionType::Income => TransactionType::Expense,
            TransactionType::Expense => TransactionType::Income,
        }
    }
}

/// The closed set of ledger categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Fees paid by families.
    Tuition,
    /// Payments to babysitters.
    BabysitterSalary,
    /// Toys and craft materials.
    ToysMaterials,
    /// Repairs and upkeep.
    Maintenance,
    /// Power, water, internet.
    Utilities,
    /// Anything else.
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 6] = [
        Category::Tuition,
        Category::BabysitterSalary,
        Category::ToysMaterials,
        Category::Maintenance,
        Category::Utilities,
        Category::Other,
    ];

    /// Returns the canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tuition => "tuition",
            Category::BabysitterSalary => "babysitter_salary",
            Category::ToysMaterials => "toys_materials",
            Category::Maintenance => "maintenance",
            Category::Utilities => "utilities",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FinanceError;

    /// Parses a category name.
    ///
    /// ```
    /// use daycare_finance::models::Category;
    ///
    /// assert_eq!("utilities".parse::<Category>().unwrap(), Category::Utilities);
    /// assert!("snacks".parse::<Category>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| FinanceError::InvalidCategory {
                category: s.to_string(),
            })
    }
}

/// A typed pointer from a transaction to the entity it concerns.
///
/// The ledger stores references but never resolves them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum Reference {
    /// A child, typically for tuition income.
    Child(String),
    /// A babysitter, typically for salary expenses.
    Babysitter(String),
}

/// A stored, immutable ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier of the transaction.
    pub id: Uuid,
    /// The business date the transaction is booked on.
    pub date: NaiveDate,
    /// Income or expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Ledger category.
    pub category: Category,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Free-form description.
    pub description: String,
    /// The entity this transaction concerns, if any.
    #[serde(default)]
    pub reference: Option<Reference>,
    /// The transaction this one offsets, for corrections.
    #[serde(default)]
    pub reverses: Option<Uuid>,
    /// When the transaction was posted.
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the amount signed by direction: positive for income.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Unvalidated input for posting a transaction.
///
/// The category is kept as text until the ledger validates it against
/// [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// The business date.
    pub date: NaiveDate,
    /// Income or expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Category name.
    pub category: String,
    /// Requested amount.
    pub amount: Decimal,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// The entity this transaction concerns, if any.
    #[serde(default)]
    pub reference: Option<Reference>,
}

impl TransactionDraft {
    /// Creates a draft without a description or reference.
    pub fn new(
        date: NaiveDate,
        transaction_type: TransactionType,
        category: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            date,
            transaction_type,
            category: category.into(),
            amount,
            description: String::new(),
            reference: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the entity reference.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Criteria for [`crate::finance::Ledger::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Inclusive date range.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Exact category.
    #[serde(default)]
    pub category: Option<Category>,
    /// Exact direction.
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Exact entity reference.
    #[serde(default)]
    pub reference: Option<Reference>,
}

impl TransactionFilter {
    /// A filter matching a single day.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date_range: Some(DateRange::single(date)),
            ..Self::default()
        }
    }

    /// Returns true if `transaction` satisfies every set criterion.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.date_range
            .is_none_or(|range| range.contains(transaction.date))
            && self.category.is_none_or(|c| c == transaction.category)
            && self
                .transaction_type
                .is_none_or(|t| t == transaction.transaction_type)
            && self
                .reference
                .as_ref()
                .is_none_or(|r| transaction.reference.as_ref() == Some(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn make_transaction(
        date: &str,
        transaction_type: TransactionType,
        category: Category,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            date: make_date(date),
            transaction_type,
            category,
            amount: Decimal::new(10000, 2),
            description: String::new(),
            reference: Some(Reference::Babysitter("B1".to_string())),
            reverses: None,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        match "snacks".parse::<Category>() {
            Err(FinanceError::InvalidCategory { category }) => assert_eq!(category, "snacks"),
            other => panic!("Expected InvalidCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_signed_amount() {
        let income = make_transaction("2024-03-01", TransactionType::Income, Category::Tuition);
        let expense =
            make_transaction("2024-03-01", TransactionType::Expense, Category::Utilities);
        assert_eq!(income.signed_amount(), Decimal::new(10000, 2));
        assert_eq!(expense.signed_amount(), Decimal::new(-10000, 2));
    }

    #[test]
    fn test_reference_serialization() {
        let reference = Reference::Child("C7".to_string());
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, r#"{"kind":"Child","id":"C7"}"#);
    }

    #[test]
    fn test_transaction_type_field_is_named_type() {
        let tx = make_transaction("2024-03-01", TransactionType::Expense, Category::Utilities);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["category"], "utilities");
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let tx = make_transaction("2024-03-01", TransactionType::Income, Category::Tuition);
        assert!(TransactionFilter::default().matches(&tx));
    }

    #[test]
    fn test_filter_by_each_criterion() {
        let tx = make_transaction("2024-03-01", TransactionType::Expense, Category::Utilities);

        assert!(TransactionFilter::on(make_date("2024-03-01")).matches(&tx));
        assert!(!TransactionFilter::on(make_date("2024-03-02")).matches(&tx));

        let by_category = TransactionFilter {
            category: Some(Category::Maintenance),
            ..TransactionFilter::default()
        };
        assert!(!by_category.matches(&tx));

        let by_type = TransactionFilter {
            transaction_type: Some(TransactionType::Expense),
            ..TransactionFilter::default()
        };
        assert!(by_type.matches(&tx));

        let by_reference = TransactionFilter {
            reference: Some(Reference::Babysitter("B2".to_string())),
            ..TransactionFilter::default()
        };
        assert!(!by_reference.matches(&tx));
    }
}

//! Inclusive calendar date ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
///
/// # Example
///
/// ```
/// use daycare_finance::models::DateRange;
/// use chrono::NaiveDate;
///
/// let march = DateRange::new(
///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
/// );
/// assert!(march.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
/// assert!(!march.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range from `start` to `end`, both inclusive.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one day.
    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// Returns true if `date` falls within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the two ranges share at least one day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns true if `other` lies inside this range and the two differ.
    pub fn strictly_contains(&self, other: &DateRange) -> bool {
        self != other && self.start <= other.start && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_date(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::new(make_date("2024-03-01"), make_date("2024-03-31"));
        assert!(range.contains(make_date("2024-03-01")));
        assert!(range.contains(make_date("2024-03-31")));
        assert!(!range.contains(make_date("2024-02-29")));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::single(make_date("2024-03-01"));
        assert!(range.contains(make_date("2024-03-01")));
        assert!(!range.contains(make_date("2024-03-02")));
    }

    #[test]
    fn test_overlaps() {
        let march = DateRange::new(make_date("2024-03-01"), make_date("2024-03-31"));
        let late_march = DateRange::new(make_date("2024-03-31"), make_date("2024-04-15"));
        let april = DateRange::new(make_date("2024-04-01"), make_date("2024-04-30"));

        assert!(march.overlaps(&late_march));
        assert!(late_march.overlaps(&april));
        assert!(!march.overlaps(&april));
    }

    #[test]
    fn test_strictly_contains() {
        let year = DateRange::new(make_date("2024-01-01"), make_date("2024-12-31"));
        let march = DateRange::new(make_date("2024-03-01"), make_date("2024-03-31"));
        let march_to_may = DateRange::new(make_date("2024-03-01"), make_date("2024-05-31"));

        assert!(year.strictly_contains(&march));
        assert!(march_to_may.strictly_contains(&march));
        assert!(!march.strictly_contains(&year));
        assert!(!march.strictly_contains(&march));
    }
}

//! Session rate lookup.
//!
//! The rate table maps a session type to the per-child amount a babysitter
//! earns. It is a plain value: lookups are pure and the table can be shared
//! across threads without synchronization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FinanceError, FinanceResult};
use crate::models::SessionType;

/// Seeded per-child rate for a half-day session.
pub const DEFAULT_HALF_DAY_RATE: Decimal = Decimal::from_parts(250000, 0, 0, false, 2);

/// Seeded per-child rate for a full-day session.
pub const DEFAULT_FULL_DAY_RATE: Decimal = Decimal::from_parts(500000, 0, 0, false, 2);

/// Per-child rates for each session type.
///
/// # Example
///
/// ```
/// use daycare_finance::finance::RateTable;
/// use daycare_finance::models::SessionType;
/// use rust_decimal::Decimal;
///
/// let table = RateTable::default();
/// assert_eq!(table.rate(SessionType::FullDay), Decimal::new(500000, 2));
/// assert!(table.rate_for("overnight").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    half_day: Decimal,
    full_day: Decimal,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            half_day: DEFAULT_HALF_DAY_RATE,
            full_day: DEFAULT_FULL_DAY_RATE,
        }
    }
}

impl RateTable {
    /// Creates a table with explicit tiers. Both rates must be positive.
    pub fn new(half_day: Decimal, full_day: Decimal) -> FinanceResult<Self> {
        Self::default()
            .with_override(SessionType::HalfDay, half_day)?
            .with_override(SessionType::FullDay, full_day)
    }

    /// Returns a copy of the table with one tier replaced.
    pub fn with_override(
        mut self,
        session_type: SessionType,
        rate: Decimal,
    ) -> FinanceResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(FinanceError::InvalidAmount {
                amount: rate,
                message: format!("{} rate must be greater than zero", session_type),
            });
        }
        let rate = rate.round_dp(2);
        match session_type {
            SessionType::HalfDay => self.half_day = rate,
            SessionType::FullDay => self.full_day = rate,
        }
        Ok(self)
    }

    /// The per-child rate for `session_type`.
    pub fn rate(&self, session_type: SessionType) -> Decimal {
        match session_type {
            SessionType::HalfDay => self.half_day,
            SessionType::FullDay => self.full_day,
        }
    }

    /// Looks up a rate by session type name.
    ///
    /// Fails with `InvalidSessionType` for names outside the rated tiers.
    pub fn rate_for(&self, session_type: &str) -> FinanceResult<Decimal> {
        Ok(self.rate(session_type.parse()?))
    }
}

//! Attendance facts and session types.
//!
//! An [`AttendanceFact`] records that a babysitter looked after a child for a
//! session on a given day. Facts are the basis for babysitter payments.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FinanceError;

/// The length of an attendance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// A morning or afternoon session.
    #[serde(alias = "half-day")]
    HalfDay,
    /// A whole-day session.
    #[serde(alias = "full-day")]
    FullDay,
}

impl SessionType {
    /// Returns the canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::HalfDay => "half_day",
            SessionType::FullDay => "full_day",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = FinanceError;

    /// Parses a session type, accepting both `half_day` and `half-day` spellings.
    ///
    /// ```
    /// use daycare_finance::models::SessionType;
    ///
    /// assert_eq!("full-day".parse::<SessionType>().unwrap(), SessionType::FullDay);
    /// assert!("overnight".parse::<SessionType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "half_day" => Ok(SessionType::HalfDay),
            "full_day" => Ok(SessionType::FullDay),
            _ => Err(FinanceError::InvalidSessionType {
                session_type: s.to_string(),
            }),
        }
    }
}

/// How the child attended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Arrived on time.
    Present,
    /// Did not attend.
    Absent,
    /// Arrived after the session start.
    Late,
    /// Left before the session end.
    EarlyDeparture,
}

impl AttendanceStatus {
    /// Returns true if the child was looked after at all.
    pub fn attended(&self) -> bool {
        !matches!(self, AttendanceStatus::Absent)
    }
}

/// A stored attendance fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFact {
    /// Unique identifier of the fact.
    pub id: Uuid,
    /// The child who attended.
    pub child_id: String,
    /// The babysitter responsible for the session.
    pub babysitter_id: String,
    /// The session day.
    pub date: NaiveDate,
    /// The session length.
    pub session_type: SessionType,
    /// When the child checked in.
    pub check_in: NaiveDateTime,
    /// When the child checked out, if they have.
    pub check_out: Option<NaiveDateTime>,
    /// Attendance status.
    pub status: AttendanceStatus,
    /// Incremented on every correction, starting at 1.
    pub revision: u32,
}

impl AttendanceFact {
    /// Returns true if check-out, when present, is not before check-in.
    pub fn has_valid_time_range(&self) -> bool {
        self.check_out.is_none_or(|out| out >= self.check_in)
    }

    /// Returns the key that must be unique across the attendance ledger.
    pub fn session_key(&self) -> (String, NaiveDate, SessionType) {
        (self.child_id.clone(), self.date, self.session_type)
    }
}

/// Input for recording a new attendance fact (check-in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttendance {
    /// The child who attended.
    pub child_id: String,
    /// The babysitter responsible for the session.
    pub babysitter_id: String,
    /// The session day.
    pub date: NaiveDate,
    /// The session length.
    pub session_type: SessionType,
    /// When the child checked in.
    pub check_in: NaiveDateTime,
    /// When the child checked out, if already known.
    #[serde(default)]
    pub check_out: Option<NaiveDateTime>,
    /// Attendance status.
    pub status: AttendanceStatus,
}

/// A partial update of an attendance fact (check-out or correction).
///
/// Child, date and session type form the uniqueness key and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendancePatch {
    /// Replacement babysitter.
    #[serde(default)]
    pub babysitter_id: Option<String>,
    /// Corrected check-in time.
    #[serde(default)]
    pub check_in: Option<NaiveDateTime>,
    /// Check-out time.
    #[serde(default)]
    pub check_out: Option<NaiveDateTime>,
    /// Corrected status.
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
}

impl AttendancePatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.babysitter_id.is_none()
            && self.check_in.is_none()
            && self.check_out.is_none()
            && self.status.is_none()
    }
}

/// Aggregated attendance over a date range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Number of recorded sessions.
    pub total_sessions: usize,
    /// Sessions with status `present`.
    pub present_count: usize,
    /// Sessions with status `absent`.
    pub absent_count: usize,
    /// Sessions with status `late`.
    pub late_count: usize,
    /// Sessions with status `early_departure`.
    pub early_departure_count: usize,
    /// Session counts per session type.
    pub by_type: BTreeMap<SessionType, usize>,
}

impl AttendanceSummary {
    pub(crate) fn add(&mut self, fact: &AttendanceFact) {
        self.total_sessions += 1;
        match fact.status {
            AttendanceStatus::Present => self.present_count += 1,
            AttendanceStatus::Absent => self.absent_count += 1,
            AttendanceStatus::Late => self.late_count += 1,
            AttendanceStatus::EarlyDeparture => self.early_departure_count += 1,
        }
        *self.by_type.entry(fact.session_type).or_insert(0) += 1;
    }
}

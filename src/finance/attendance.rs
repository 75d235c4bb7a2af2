//! The attendance ledger: who was looked after, by whom, and when.
//!
//! At most one fact exists per (child, date, session type). The uniqueness
//! check and the insert happen under the same lock, so concurrent check-ins
//! for the same session cannot both succeed. Corrections update the fact in
//! place and keep every prior version in an audit history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use super::journal::{JournalEntry, JournalWriter};
use crate::error::{FinanceError, FinanceResult};
use crate::models::{
    AttendanceFact, AttendancePatch, AttendanceStatus, AttendanceSummary, DateRange,
    NewAttendance, SessionType,
};

type SessionKey = (String, NaiveDate, SessionType);

#[derive(Debug, Default)]
struct AttendanceBook {
    facts: Vec<AttendanceFact>,
    by_id: HashMap<Uuid, usize>,
    by_session: HashMap<SessionKey, Uuid>,
    history: HashMap<Uuid, Vec<AttendanceFact>>,
    current_status: HashMap<String, AttendanceStatus>,
}

impl AttendanceBook {
    fn get(&self, id: Uuid) -> Option<&AttendanceFact> {
        self.by_id.get(&id).map(|&idx| &self.facts[idx])
    }
}

/// Append-only store of attendance facts.
pub struct AttendanceLedger {
    book: Mutex<AttendanceBook>,
    journal: Arc<JournalWriter>,
}

impl AttendanceLedger {
    /// Creates an empty ledger that journals through `journal`.
    pub fn new(journal: Arc<JournalWriter>) -> Self {
        Self {
            book: Mutex::new(AttendanceBook::default()),
            journal,
        }
    }

    /// Records a check-in.
    ///
    /// Fails with `DuplicateSession` if the child already has a fact for the
    /// same date and session type; the store is left unchanged in that case.
    pub fn record(&self, new: NewAttendance) -> FinanceResult<AttendanceFact> {
        let fact = AttendanceFact {
            id: Uuid::new_v4(),
            child_id: new.child_id,
            babysitter_id: new.babysitter_id,
            date: new.date,
            session_type: new.session_type,
            check_in: new.check_in,
            check_out: new.check_out,
            status: new.status,
            revision: 1,
        };
        if !fact.has_valid_time_range() {
            return Err(FinanceError::InvalidTimeRange { id: fact.id });
        }

        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let key = fact.session_key();
        if book.by_session.contains_key(&key) {
            warn!(
                child_id = %fact.child_id,
                date = %fact.date,
                session_type = %fact.session_type,
                "Rejected duplicate attendance session"
            );
            return Err(FinanceError::DuplicateSession {
                child_id: fact.child_id,
                date: fact.date,
                session_type: fact.session_type.to_string(),
            });
        }

        self.journal.record(&JournalEntry::AttendanceRecorded { fact: fact.clone() })?;

        let idx = book.facts.len();
        book.by_id.insert(fact.id, idx);
        book.by_session.insert(key, fact.id);
        book.current_status.insert(fact.child_id.clone(), fact.status);
        book.facts.push(fact.clone());

        info!(
            attendance_id = %fact.id,
            child_id = %fact.child_id,
            babysitter_id = %fact.babysitter_id,
            date = %fact.date,
            session_type = %fact.session_type,
            "Attendance recorded"
        );
        Ok(fact)
    }

    /// Applies a check-out or correction to an existing fact.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidTimeRange` if the
    /// result would check out before checking in.
    pub fn update(&self, id: Uuid, patch: AttendancePatch) -> FinanceResult<AttendanceFact> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let &idx = book
            .by_id
            .get(&id)
            .ok_or_else(|| FinanceError::not_found("Attendance", id))?;

        let previous = book.facts[idx].clone();
        if patch.is_empty() {
            return Ok(previous);
        }

        let mut updated = previous.clone();
        if let Some(babysitter_id) = patch.babysitter_id {
            updated.babysitter_id = babysitter_id;
        }
        if let Some(check_in) = patch.check_in {
            updated.check_in = check_in;
        }
        if let Some(check_out) = patch.check_out {
            updated.check_out = Some(check_out);
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if !updated.has_valid_time_range() {
            return Err(FinanceError::InvalidTimeRange { id });
        }
        updated.revision = previous.revision + 1;

        self.journal.record(&JournalEntry::AttendanceUpdated {
            fact: updated.clone(),
        })?;

        book.history.entry(id).or_default().push(previous);
        book.current_status.insert(updated.child_id.clone(), updated.status);
        book.facts[idx] = updated.clone();

        info!(
            attendance_id = %id,
            revision = updated.revision,
            status = ?updated.status,
            "Attendance updated"
        );
        Ok(updated)
    }

    /// Aggregates all facts whose date falls within `range`.
    pub fn summary(&self, range: DateRange) -> AttendanceSummary {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary = AttendanceSummary::default();
        for fact in book.facts.iter().filter(|f| range.contains(f.date)) {
            summary.add(fact);
        }
        summary
    }

    /// Looks up a fact by id.
    pub fn get(&self, id: Uuid) -> Option<AttendanceFact> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.get(id).cloned()
    }

    /// Prior versions of a corrected fact, oldest first.
    pub fn history(&self, id: Uuid) -> Vec<AttendanceFact> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.history.get(&id).cloned().unwrap_or_default()
    }

    /// The most recently written status for a child.
    ///
    /// This view is last-write-wins and informational only.
    pub fn current_status(&self, child_id: &str) -> Option<AttendanceStatus> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.current_status.get(child_id).copied()
    }

    /// Facts a babysitter is responsible for on one date and session type.
    pub fn facts_for(
        &self,
        babysitter_id: &str,
        date: NaiveDate,
        session_type: SessionType,
    ) -> Vec<AttendanceFact> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.facts
            .iter()
            .filter(|f| {
                f.babysitter_id == babysitter_id && f.date == date && f.session_type == session_type
            })
            .cloned()
            .collect()
    }

    /// Returns true if the babysitter looked after at least one attending child
    /// for the given date and session type.
    pub fn has_basis(
        &self,
        babysitter_id: &str,
        date: NaiveDate,
        session_type: SessionType,
    ) -> bool {
        self.facts_for(babysitter_id, date, session_type)
            .iter()
            .any(|f| f.status.attended())
    }

    /// Number of stored facts.
    pub fn len(&self) -> usize {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .facts
            .len()
    }

    /// Returns true if no fact has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

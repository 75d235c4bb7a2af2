//! Durable journal of engine mutations.
//!
//! Every mutation is written to the journal before the in-memory stores are
//! touched. A write that still fails after the retry policy is exhausted
//! aborts the operation with [`FinanceError::Storage`] and leaves no partial
//! state behind.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::{FinanceError, FinanceResult};
use crate::models::{AttendanceFact, Budget, PaymentRecord, Transaction};

/// One durable record of a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEntry {
    /// A new attendance fact.
    AttendanceRecorded {
        /// The stored fact.
        fact: AttendanceFact,
    },
    /// A corrected attendance fact.
    AttendanceUpdated {
        /// The fact after the correction.
        fact: AttendanceFact,
    },
    /// A pending payment was computed.
    PaymentComputed {
        /// The new payment.
        payment: PaymentRecord,
    },
    /// A payment was cleared together with its ledger posting.
    PaymentCleared {
        /// The payment after the transition.
        payment: PaymentRecord,
        /// The confirming ledger transaction.
        transaction: Transaction,
    },
    /// A payment was cancelled.
    PaymentCancelled {
        /// The payment after the transition.
        payment: PaymentRecord,
    },
    /// A transaction was appended to the ledger.
    TransactionPosted {
        /// The stored transaction.
        transaction: Transaction,
    },
    /// A budget was registered.
    BudgetRegistered {
        /// The stored budget.
        budget: Budget,
    },
}

impl JournalEntry {
    /// Short event name for logging.
    pub fn event(&self) -> &'static str {
        match self {
            JournalEntry::AttendanceRecorded { .. } => "attendance_recorded",
            JournalEntry::AttendanceUpdated { .. } => "attendance_updated",
            JournalEntry::PaymentComputed { .. } => "payment_computed",
            JournalEntry::PaymentCleared { .. } => "payment_cleared",
            JournalEntry::PaymentCancelled { .. } => "payment_cancelled",
            JournalEntry::TransactionPosted { .. } => "transaction_posted",
            JournalEntry::BudgetRegistered { .. } => "budget_registered",
        }
    }
}

/// A failed journal write.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The underlying file could not be written.
    #[error("journal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The entry could not be encoded.
    #[error("journal entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    /// The journal backend is unavailable.
    #[error("journal unavailable: {0}")]
    Unavailable(String),
}

/// An append-only durable sink.
pub trait Journal: Send + Sync {
    /// Durably appends one entry.
    fn append(&self, entry: &JournalEntry) -> Result<(), JournalError>;
}

/// Keeps entries in process memory.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl MemoryJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every entry written so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Journal for MemoryJournal {
    fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Writes entries as JSON lines to a file.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileJournal {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Reads every entry back from `path`.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<JournalEntry>, JournalError> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// The journal file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for FileJournal {
    fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

/// Bounded retry with exponential backoff for journal writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff: Duration,
    /// Upper bound on time spent on one write, including waits.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Writes entries through a [`Journal`], retrying transient failures.
#[derive(Clone)]
pub struct JournalWriter {
    journal: Arc<dyn Journal>,
    policy: RetryPolicy,
}

impl JournalWriter {
    /// Wraps `journal` with `policy`.
    pub fn new(journal: Arc<dyn Journal>, policy: RetryPolicy) -> Self {
        Self { journal, policy }
    }

    /// A writer backed by a fresh [`MemoryJournal`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryJournal::new()), RetryPolicy::default())
    }

    /// Appends `entry`, retrying until the policy gives up.
    pub fn record(&self, entry: &JournalEntry) -> FinanceResult<()> {
        let started = Instant::now();
        let mut delay = self.policy.backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.journal.append(entry) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            let out_of_time = started.elapsed() + delay > self.policy.timeout;
            if attempt >= self.policy.max_attempts.max(1) || out_of_time {
                error!(
                    event = entry.event(),
                    attempts = attempt,
                    error = %err,
                    "Journal write failed, giving up"
                );
                return Err(FinanceError::Storage {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            warn!(
                event = entry.event(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Journal write failed, retrying"
            );
            thread::sleep(delay);
            delay = delay.saturating_mul(2);
        }
    }
}

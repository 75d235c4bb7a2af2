//! Configuration types deserialized from the YAML files in a config directory.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::finance::{DEFAULT_FULL_DAY_RATE, DEFAULT_HALF_DAY_RATE};
use crate::models::Budget;

/// Contents of `rates.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateSettings {
    /// Currency code the rates are quoted in. Informational only.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Per-child rate for a half-day session.
    #[serde(default = "default_half_day")]
    pub half_day: Decimal,
    /// Per-child rate for a full-day session.
    #[serde(default = "default_full_day")]
    pub full_day: Decimal,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_half_day() -> Decimal {
    DEFAULT_HALF_DAY_RATE
}

fn default_full_day() -> Decimal {
    DEFAULT_FULL_DAY_RATE
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            half_day: DEFAULT_HALF_DAY_RATE,
            full_day: DEFAULT_FULL_DAY_RATE,
        }
    }
}

/// Contents of `budgets.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BudgetsConfig {
    /// Budgets registered at start-up.
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

/// Contents of `journal.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JournalSettings {
    /// JSON-lines journal file. Relative paths resolve against the config
    /// directory. Without a path the journal is kept in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Total write attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Upper bound on one write including retries, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    10
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Everything loaded from a configuration directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rate tiers.
    pub rates: RateSettings,
    /// Start-up budgets.
    pub budgets: Vec<Budget>,
    /// Journal location and retry policy.
    pub journal: JournalSettings,
}

//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{FinanceError, FinanceResult};
use crate::finance::{FileJournal, JournalWriter, MemoryJournal, RateTable, RetryPolicy};
use crate::models::Budget;

use super::types::{BudgetsConfig, EngineConfig, JournalSettings, RateSettings};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/daycare/
/// ├── rates.yaml    # Session rate tiers (required)
/// ├── budgets.yaml  # Budgets registered at start-up (optional)
/// └── journal.yaml  # Journal file and retry policy (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use daycare_finance::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/daycare")?;
/// println!("Full-day rate: {}", loader.config().rates.full_day);
/// # Ok::<(), daycare_finance::error::FinanceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: PathBuf,
    config: EngineConfig,
    rate_table: RateTable,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Fails with `ConfigNotFound` if `rates.yaml` is missing, and with
    /// `ConfigParseError` if any file is malformed or holds invalid values
    /// (non-positive rates, invalid budgets, zero retry attempts).
    pub fn load<P: AsRef<Path>>(path: P) -> FinanceResult<Self> {
        let dir = path.as_ref().to_path_buf();

        let rates_path = dir.join("rates.yaml");
        let rates: RateSettings = Self::load_yaml(&rates_path)?;
        let rate_table = RateTable::new(rates.half_day, rates.full_day)
            .map_err(|e| Self::invalid(&rates_path, e))?;

        let budgets_path = dir.join("budgets.yaml");
        let budgets = Self::load_optional_yaml::<BudgetsConfig>(&budgets_path)?
            .unwrap_or_default()
            .budgets;
        for budget in &budgets {
            budget
                .validate()
                .map_err(|e| Self::invalid(&budgets_path, e))?;
        }

        let journal_path = dir.join("journal.yaml");
        let journal =
            Self::load_optional_yaml::<JournalSettings>(&journal_path)?.unwrap_or_default();
        if journal.max_attempts == 0 {
            return Err(FinanceError::ConfigParseError {
                path: journal_path.display().to_string(),
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        info!(
            path = %dir.display(),
            currency = %rates.currency,
            budgets = budgets.len(),
            journal = ?journal.path,
            "Configuration loaded"
        );

        Ok(Self {
            dir,
            config: EngineConfig {
                rates,
                budgets,
                journal,
            },
            rate_table,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: DeserializeOwned>(path: &Path) -> FinanceResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| FinanceError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| FinanceError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Like [`ConfigLoader::load_yaml`], but a missing file is `None`.
    fn load_optional_yaml<T: DeserializeOwned>(path: &Path) -> FinanceResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_yaml(path).map(Some)
    }

    fn invalid(path: &Path, err: FinanceError) -> FinanceError {
        FinanceError::ConfigParseError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The validated rate table.
    pub fn rate_table(&self) -> RateTable {
        self.rate_table
    }

    /// Budgets to register at start-up.
    pub fn budgets(&self) -> &[Budget] {
        &self.config.budgets
    }

    /// The journal retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        let journal = &self.config.journal;
        RetryPolicy {
            max_attempts: journal.max_attempts,
            backoff: Duration::from_millis(journal.backoff_ms),
            timeout: Duration::from_millis(journal.timeout_ms),
        }
    }

    /// Where the journal file lives, if one is configured.
    pub fn journal_path(&self) -> Option<PathBuf> {
        self.config.journal.path.as_ref().map(|p| self.dir.join(p))
    }

    /// Opens the configured journal wrapped in the configured retry policy.
    ///
    /// Fails with `Storage` if the journal file cannot be opened.
    pub fn open_journal(&self) -> FinanceResult<JournalWriter> {
        let policy = self.retry_policy();
        match self.journal_path() {
            Some(path) => {
                let journal = FileJournal::open(&path).map_err(|e| FinanceError::Storage {
                    attempts: 1,
                    message: format!("{}: {}", path.display(), e),
                })?;
                Ok(JournalWriter::new(Arc::new(journal), policy))
            }
            None => Ok(JournalWriter::new(Arc::new(MemoryJournal::new()), policy)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, Category, SessionType};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/daycare"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.rate_table().rate(SessionType::HalfDay), dec("2500.00"));
        assert_eq!(loader.rate_table().rate(SessionType::FullDay), dec("5000.00"));
        assert_eq!(loader.config().rates.currency, "USD");
    }

    #[test]
    fn test_fixture_budgets() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let utilities = loader
            .budgets()
            .iter()
            .find(|b| b.category == Category::Utilities)
            .expect("utilities budget");
        assert_eq!(utilities.amount, dec("1000.00"));
        assert_eq!(utilities.period, BudgetPeriod::Monthly);
        assert_eq!(utilities.threshold_percent, dec("80"));
    }

    #[test]
    fn test_missing_rates_file_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();

        match ConfigLoader::load(dir.path()) {
            Err(FinanceError::ConfigNotFound { path }) => assert!(path.ends_with("rates.yaml")),
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_files_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: \"30.00\"\nfull_day: \"55.50\"\n");

        let loader = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(loader.rate_table().rate(SessionType::FullDay), dec("55.50"));
        assert!(loader.budgets().is_empty());
        assert_eq!(loader.retry_policy(), RetryPolicy::default());
        assert!(loader.journal_path().is_none());
    }

    #[test]
    fn test_malformed_yaml_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: [unclosed\n");

        assert!(matches!(
            ConfigLoader::load(dir.path()),
            Err(FinanceError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_non_positive_rate_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: \"0\"\nfull_day: \"50\"\n");

        match ConfigLoader::load(dir.path()) {
            Err(FinanceError::ConfigParseError { path, message }) => {
                assert!(path.ends_with("rates.yaml"));
                assert!(message.contains("rate must be greater than zero"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_budget_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: \"25\"\nfull_day: \"50\"\n");
        write(
            dir.path(),
            "budgets.yaml",
            "budgets:\n  - category: utilities\n    amount: \"100\"\n    period: monthly\n    \
             start_date: 2024-03-31\n    end_date: 2024-03-01\n    threshold_percent: \"80\"\n",
        );

        assert!(matches!(
            ConfigLoader::load(dir.path()),
            Err(FinanceError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_file_journal_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: \"25\"\nfull_day: \"50\"\n");
        write(
            dir.path(),
            "journal.yaml",
            "path: journal.jsonl\nmax_attempts: 5\nbackoff_ms: 2\ntimeout_ms: 500\n",
        );

        let loader = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(loader.retry_policy().max_attempts, 5);
        assert_eq!(loader.retry_policy().backoff, Duration::from_millis(2));
        assert_eq!(
            loader.journal_path(),
            Some(dir.path().join("journal.jsonl"))
        );

        loader.open_journal().unwrap();
        assert!(dir.path().join("journal.jsonl").exists());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "rates.yaml", "half_day: \"25\"\nfull_day: \"50\"\n");
        write(dir.path(), "journal.yaml", "max_attempts: 0\n");

        assert!(matches!(
            ConfigLoader::load(dir.path()),
            Err(FinanceError::ConfigParseError { .. })
        ));
    }
}

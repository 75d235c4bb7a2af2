//! Configuration loading for the finance engine.
//!
//! Rate tiers, start-up budgets and journal settings are read from a
//! directory of YAML files.
//!
//! # Example
//!
//! ```no_run
//! use daycare_finance::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/daycare").unwrap();
//! println!("Budgets: {}", config.budgets().len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{BudgetsConfig, EngineConfig, JournalSettings, RateSettings};

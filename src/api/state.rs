//! Application state for the finance API.

use std::sync::Arc;

use crate::engine::FinanceEngine;

/// Shared application state.
///
/// Every handler works against the same engine, so all requests see one set
/// of stores.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<FinanceEngine>,
}

impl AppState {
    /// Creates a new application state around `engine`.
    pub fn new(engine: FinanceEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Returns a reference to the engine.
    pub fn engine(&self) -> &FinanceEngine {
        &self.engine
    }

    /// Returns a shared handle to the engine for work moved off the request task.
    pub fn shared_engine(&self) -> Arc<FinanceEngine> {
        Arc::clone(&self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_clones_share_engine() {
        let state = AppState::new(FinanceEngine::builder().build().unwrap());
        let other = state.clone();
        assert!(std::ptr::eq(state.engine(), other.engine()));
        assert!(std::ptr::eq(state.engine(), &*other.shared_engine()));
    }
}

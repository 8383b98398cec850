//! Application state for the Premium Engine API.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::error::EngineResult;
use crate::lifecycle::CalculationLifecycleManager;
use crate::store::InMemoryStore;

/// Shared application state.
///
/// Holds the lifecycle manager that every handler goes through.
#[derive(Clone)]
pub struct AppState {
    manager: CalculationLifecycleManager,
}

impl AppState {
    /// Creates a new application state around a lifecycle manager.
    pub fn new(manager: CalculationLifecycleManager) -> Self {
        Self { manager }
    }

    /// Creates a state backed by an in-memory store seeded from configuration.
    pub fn from_config(config: &ConfigLoader) -> EngineResult<Self> {
        let store = InMemoryStore::from_config(config)?;
        Ok(Self::new(CalculationLifecycleManager::new(Arc::new(store))))
    }

    /// Returns the lifecycle manager.
    pub fn manager(&self) -> &CalculationLifecycleManager {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // axum state must be Clone
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}

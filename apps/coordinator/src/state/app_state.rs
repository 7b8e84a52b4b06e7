use std::sync::Arc;

use crate::config::Config;
use crate::services::SessionCoordinator;

/// Shared resources handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    /// Configuration the state was built from, when built from one.
    pub config: Option<Arc<Config>>,
}

impl AppState {
    pub fn new(coordinator: Arc<SessionCoordinator>, config: Option<Config>) -> Self {
        Self {
            coordinator,
            config: config.map(Arc::new),
        }
    }

    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }
}

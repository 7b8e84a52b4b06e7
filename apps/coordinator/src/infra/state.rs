use std::sync::Arc;

use tracing::info;

use crate::bridge::{InMemoryPushChannel, PushChannel, RedisPushChannel};
use crate::config::{Config, SessionLimits};
use crate::error::AppError;
use crate::gateway::{BackendGateway, HttpBackendGateway};
use crate::services::SessionCoordinator;
use crate::state::app_state::AppState;

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    config: Option<Config>,
    limits: SessionLimits,
    gateway: Option<Arc<dyn BackendGateway>>,
    push: Option<Arc<dyn PushChannel>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            limits: SessionLimits::default(),
            gateway: None,
            push: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.limits = config.limits;
        self.config = Some(config);
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn BackendGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_push_channel(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    /// Explicit parts win over the ones derived from configuration. Without
    /// a Redis URL, push channels stay in-process.
    pub fn build(self) -> Result<AppState, AppError> {
        let gateway: Arc<dyn BackendGateway> = match self.gateway {
            Some(gateway) => gateway,
            None => {
                let gateway_config = self
                    .config
                    .as_ref()
                    .map(|c| c.gateway.clone())
                    .unwrap_or_default();
                info!(endpoint = %gateway_config.endpoint, "Using HTTP backend gateway");
                Arc::new(HttpBackendGateway::new(&gateway_config)?)
            }
        };

        let push: Arc<dyn PushChannel> = match self.push {
            Some(push) => push,
            None => match self.config.as_ref().and_then(|c| c.redis_url.as_deref()) {
                Some(url) => {
                    info!("Using Redis push channel");
                    Arc::new(RedisPushChannel::new(url)?)
                }
                None => {
                    info!("Using in-process push channel");
                    Arc::new(InMemoryPushChannel::new())
                }
            },
        };

        let coordinator = SessionCoordinator::new(gateway, push, self.limits);
        Ok(AppState::new(coordinator, self.config))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

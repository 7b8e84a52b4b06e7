//! Runtime configuration.

pub mod app;

pub use app::{Config, GatewayConfig, SessionLimits};

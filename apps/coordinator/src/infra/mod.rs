//! Infrastructure layer: wiring shared state from configuration.

pub mod state;

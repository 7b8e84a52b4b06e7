//! Shared helpers for the coordinator's unit and integration tests.

pub mod logging;
pub mod problem_details;

#![allow(dead_code)]

pub mod harness;

pub use fake_gateway::{FakeFailure, FakeGateway};
pub use harness::{Harness, TestClient};

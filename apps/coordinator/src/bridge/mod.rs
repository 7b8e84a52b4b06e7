//! Orchestrator bridge: turns push-channel envelopes into phase triggers for
//! one game.

pub mod channel;
pub mod envelope;
pub mod redis;
pub mod subscription;

pub use channel::{EnvelopeStream, InMemoryPushChannel, PushChannel};
pub use envelope::{LocationRef, OrchestratorEvent, PushEnvelope};
pub use redis::RedisPushChannel;
pub use subscription::{OrchestratorSink, OrchestratorSubscription};

//! Push channels carry orchestrator envelopes to the coordinator.

use std::pin::Pin;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::bridge::envelope::PushEnvelope;

pub type EnvelopeStream = Pin<Box<dyn Stream<Item = PushEnvelope> + Send + 'static>>;

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Subscribe to `endpoint`. Envelopes published after this returns are
    /// delivered in publish order. Dropping the stream unsubscribes.
    async fn open(&self, endpoint: &str) -> EnvelopeStream;
}

const IN_MEMORY_CAPACITY: usize = 64;

/// Process-local channel, used when no Redis is configured and in tests.
#[derive(Default)]
pub struct InMemoryPushChannel {
    channels: DashMap<String, broadcast::Sender<PushEnvelope>>,
}

impl InMemoryPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver to every open subscription on `endpoint`. Returns how many
    /// subscribers received it.
    pub fn publish(&self, endpoint: &str, envelope: PushEnvelope) -> usize {
        match self.channels.get(endpoint) {
            Some(tx) => tx.send(envelope).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, endpoint: &str) -> usize {
        self.channels
            .get(endpoint)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PushChannel for InMemoryPushChannel {
    async fn open(&self, endpoint: &str) -> EnvelopeStream {
        let rx = self
            .channels
            .entry(endpoint.to_string())
            .or_insert_with(|| broadcast::channel(IN_MEMORY_CAPACITY).0)
            .subscribe();

        let endpoint = endpoint.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "[BRIDGE] in-memory subscriber lagged");
                None
            }
        });
        Box::pin(stream)
    }
}

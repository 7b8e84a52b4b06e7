use std::sync::Weak;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bridge::channel::EnvelopeStream;
use crate::bridge::envelope::OrchestratorEvent;
use crate::domain::game::LobbyCode;
use crate::error::AppError;

/// Receiver of decoded orchestrator events for a game.
#[async_trait]
pub trait OrchestratorSink: Send + Sync {
    async fn apply_orchestrator_event(
        &self,
        code: &LobbyCode,
        event: OrchestratorEvent,
    ) -> Result<(), AppError>;
}

/// A running bridge task for one game.
///
/// Dropping the handle cancels the task. Cancellation is observed between
/// events, so an event already being applied always completes.
pub struct OrchestratorSubscription {
    endpoint: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl OrchestratorSubscription {
    pub fn spawn(
        code: LobbyCode,
        endpoint: String,
        stream: EnvelopeStream,
        sink: Weak<dyn OrchestratorSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_bridge(
            code,
            endpoint.clone(),
            stream,
            sink,
            cancel.clone(),
        ));
        Self {
            endpoint,
            cancel,
            task,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for OrchestratorSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_bridge(
    code: LobbyCode,
    endpoint: String,
    mut stream: EnvelopeStream,
    sink: Weak<dyn OrchestratorSink>,
    cancel: CancellationToken,
) {
    info!(lobby = %code, endpoint = %endpoint, "[BRIDGE] subscription started");

    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = stream.next() => match next {
                Some(envelope) => envelope,
                None => {
                    warn!(lobby = %code, "[BRIDGE] push stream ended");
                    break;
                }
            },
        };

        let event = match OrchestratorEvent::decode(&envelope) {
            Ok(event) => event,
            Err(err) => {
                warn!(lobby = %code, target = %envelope.target, error = %err, "[BRIDGE] undecodable envelope dropped");
                continue;
            }
        };

        let Some(sink) = sink.upgrade() else {
            break;
        };

        let trigger = event.trigger().as_str();
        debug!(lobby = %code, trigger, "[BRIDGE] applying event");
        match sink.apply_orchestrator_event(&code, event).await {
            Ok(()) => {}
            Err(err @ AppError::IllegalTransition { .. }) => {
                warn!(lobby = %code, trigger, error = %err, "[BRIDGE] event dropped");
            }
            Err(err) => {
                error!(lobby = %code, trigger, error = %err, "[BRIDGE] event failed");
            }
        }
    }

    info!(lobby = %code, "[BRIDGE] subscription stopped");
}

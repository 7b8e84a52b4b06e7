//! Redis pub/sub push channel.
//!
//! Each opened endpoint gets its own subscriber task with its own
//! connection. The task reconnects with jittered exponential backoff and
//! exits once the consumer drops the stream.

use std::time::Duration;

use async_trait::async_trait;
use rand::random;
use redis::aio::PubSub;
use redis::Client;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::bridge::channel::{EnvelopeStream, PushChannel};
use crate::bridge::envelope::PushEnvelope;
use crate::error::AppError;

// Subscriber retry configuration
const INITIAL_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_DELAY_MULTIPLIER: f64 = 2.0;
const JITTER_PERCENT: f64 = 0.2;

const STREAM_BUFFER: usize = 64;
/// How long `open` waits for the first SUBSCRIBE to be acknowledged.
const SUBSCRIBE_WAIT: Duration = Duration::from_secs(2);

pub struct RedisPushChannel {
    client: Client,
}

impl RedisPushChannel {
    pub fn new(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushChannel for RedisPushChannel {
    async fn open(&self, endpoint: &str) -> EnvelopeStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let client = self.client.clone();
        let channel = endpoint.to_string();

        tokio::spawn(async move {
            run_subscription_loop_with_retry(client, channel, tx, ready_tx).await;
        });

        match timeout(SUBSCRIBE_WAIT, ready_rx).await {
            Ok(Ok(())) => debug!(endpoint, "[BRIDGE] redis subscription ready"),
            _ => warn!(
                endpoint,
                "[BRIDGE] redis subscription not confirmed yet, continuing"
            ),
        }

        Box::pin(ReceiverStream::new(rx))
    }
}

fn is_transient_error(err: &AppError) -> bool {
    if let AppError::Config { .. } = err {
        return false;
    }

    let message = err.to_string().to_lowercase();
    !(message.contains("authentication failed")
        || message.contains("invalid redis_url")
        || message.contains("non-tcp"))
}

fn calculate_retry_delay(attempt: u32) -> Duration {
    let base_delay =
        INITIAL_RETRY_DELAY_SECS as f64 * RETRY_DELAY_MULTIPLIER.powi(attempt as i32 - 1);
    let capped_delay = base_delay.min(MAX_RETRY_DELAY_SECS as f64);

    let jitter_range = capped_delay * JITTER_PERCENT;
    let jitter = (random::<f64>() * 2.0 - 1.0) * jitter_range;
    let final_delay = (capped_delay + jitter).max(0.1);

    Duration::from_secs_f64(final_delay)
}

async fn run_subscription_loop_with_retry(
    client: Client,
    channel: String,
    tx: mpsc::Sender<PushEnvelope>,
    ready: oneshot::Sender<()>,
) {
    let mut ready = Some(ready);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            _ = tx.closed() => {
                debug!(channel = %channel, "[BRIDGE] consumer gone, stopping redis subscriber");
                return;
            }
            res = run_subscription(&client, &channel, &tx, &mut ready) => res,
        };

        match outcome {
            Ok(()) => {
                info!(channel = %channel, "[BRIDGE] redis subscription closed");
                return;
            }
            Err(err) if !is_transient_error(&err) => {
                error!(
                    channel = %channel,
                    error = %err,
                    attempt,
                    "[BRIDGE] redis subscription failed with permanent error, exiting"
                );
                return;
            }
            Err(err) => {
                let delay = calculate_retry_delay(attempt);
                warn!(
                    channel = %channel,
                    error = %err,
                    attempt,
                    retry_delay_secs = delay.as_secs_f64(),
                    "[BRIDGE] redis subscription failed, retrying"
                );
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = sleep(delay) => {}
                }
                if attempt >= 20 {
                    attempt = 10;
                }
            }
        }
    }
}

/// One connection's worth of subscription. `Ok` means the consumer went away.
async fn run_subscription(
    client: &Client,
    channel: &str,
    tx: &mpsc::Sender<PushEnvelope>,
    ready: &mut Option<oneshot::Sender<()>>,
) -> Result<(), AppError> {
    let conn_info = client.get_connection_info();

    let addr = match conn_info.addr().clone() {
        redis::ConnectionAddr::Tcp(host, port) => (host, port),
        _ => {
            return Err(AppError::internal(
                "Non-TCP redis addresses are not supported for pubsub",
            ))
        }
    };

    let stream = tokio::net::TcpStream::connect(addr)
        .await
        .map_err(|err| AppError::internal(format!("Failed to connect to Redis: {err}")))?;

    let mut pubsub = PubSub::new(conn_info.redis_settings(), stream)
        .await
        .map_err(|err| AppError::internal(format!("Failed to create Redis pubsub: {err}")))?;

    pubsub.subscribe(channel).await.map_err(|err| {
        AppError::internal(format!("Failed to subscribe to {channel}: {err}"))
    })?;

    info!(channel, "[BRIDGE] redis subscription established");
    if let Some(ready) = ready.take() {
        let _ = ready.send(());
    }

    let mut messages = pubsub.into_on_message();
    while let Some(msg) = messages.next().await {
        let Ok(payload) = msg.get_payload::<String>() else {
            warn!(channel, "[BRIDGE] non-text payload ignored");
            continue;
        };

        match serde_json::from_str::<PushEnvelope>(&payload) {
            Ok(envelope) => {
                if tx.send(envelope).await.is_err() {
                    return Ok(());
                }
            }
            Err(err) => {
                warn!(channel, error = %err, "[BRIDGE] malformed push envelope ignored");
            }
        }
    }

    Err(AppError::internal("Redis pubsub stream ended"))
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::SessionCoordinator;
use crate::state::app_state::AppState;
use crate::ws::hub::ConnId;
use crate::ws::protocol::{ClientMsg, ErrorCode, ServerMsg, PROTOCOL_VERSION};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(Uuid::new_v4(), app_state.coordinator.clone());
    ws::start(session, &req, stream)
}

/// One client connection.
///
/// Intents are forwarded to a per-connection worker task that applies them
/// in arrival order. When the socket goes away the worker finishes whatever
/// it is doing and then tells the coordinator the connection closed.
pub struct WsSession {
    conn_id: ConnId,
    coordinator: Arc<SessionCoordinator>,
    intents: Option<mpsc::UnboundedSender<ClientMsg>>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(conn_id: ConnId, coordinator: Arc<SessionCoordinator>) -> Self {
        Self {
            conn_id,
            coordinator,
            intents: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    fn send_error_and_close(
        &self,
        ctx: &mut ws::WebsocketContext<Self>,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        let msg = ServerMsg::Error {
            code,
            message: message.into(),
        };
        Self::send_json(ctx, &msg);
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
        ctx.stop();
    }

    fn start_heartbeat(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "[WS SESSION] heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn start_intent_worker(&mut self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMsg>();
        let coordinator = self.coordinator.clone();
        let conn_id = self.conn_id;

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                coordinator.handle_intent(conn_id, msg).await;
            }
            coordinator.disconnect(conn_id).await;
        });

        self.intents = Some(tx);
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let Ok(msg) = serde_json::from_str::<ClientMsg>(text) else {
            self.send_error_and_close(ctx, ErrorCode::BadRequest, "Malformed JSON");
            return;
        };

        if let ClientMsg::Hello { protocol } = msg {
            if protocol != PROTOCOL_VERSION {
                self.send_error_and_close(
                    ctx,
                    ErrorCode::BadProtocol,
                    "Unsupported protocol version",
                );
                return;
            }
            Self::send_json(
                ctx,
                &ServerMsg::HelloAck {
                    protocol: PROTOCOL_VERSION,
                },
            );
            return;
        }

        debug!(conn_id = %self.conn_id, intent = msg.kind(), "[WS SESSION] intent");
        let delivered = self
            .intents
            .as_ref()
            .is_some_and(|tx| tx.send(msg).is_ok());
        if !delivered {
            warn!(conn_id = %self.conn_id, "[WS SESSION] intent worker gone, closing");
            ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
            ctx.stop();
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] started");

        let (tx, rx) = mpsc::unbounded_channel();
        self.coordinator.connect(self.conn_id, tx);
        ctx.add_stream(UnboundedReceiverStream::new(rx));

        self.start_intent_worker();
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Closing the intent queue lets the worker drain and then disconnect.
        self.intents = None;
        info!(conn_id = %self.conn_id, "[WS SESSION] stopped");
    }
}

/// Outbound events queued by the coordinator.
impl StreamHandler<ServerMsg> for WsSession {
    fn handle(&mut self, msg: ServerMsg, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        debug!(conn_id = %self.conn_id, "[WS SESSION] outbound queue closed");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.send_error_and_close(ctx, ErrorCode::BadRequest, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "[WS SESSION] protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

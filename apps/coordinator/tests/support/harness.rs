// In-process coordinator with a fake backend and channel-backed clients.

use std::sync::Arc;
use std::time::Duration;

use coordinator::bridge::{InMemoryPushChannel, PushEnvelope};
use coordinator::config::SessionLimits;
use coordinator::domain::game::{Game, LobbyCode};
use coordinator::domain::player::PlayerId;
use coordinator::services::SessionCoordinator;
use coordinator::ws::hub::ConnId;
use coordinator::ws::protocol::{ClientMsg, ServerMsg};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::fake_gateway::{push_endpoint, FakeGateway};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub coordinator: Arc<SessionCoordinator>,
    pub gateway: Arc<FakeGateway>,
    pub push: Arc<InMemoryPushChannel>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(SessionLimits::default())
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        let gateway = FakeGateway::new();
        let push = Arc::new(InMemoryPushChannel::new());
        let coordinator = SessionCoordinator::new(gateway.clone(), push.clone(), limits);
        Self {
            coordinator,
            gateway,
            push,
        }
    }

    /// A connected, not yet logged-in client.
    pub fn client(&self) -> TestClient {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.coordinator.connect(conn_id, tx);
        TestClient {
            conn_id,
            player_id: None,
            rx,
            coordinator: self.coordinator.clone(),
        }
    }

    /// A logged-in client with its menu snapshot consumed.
    pub async fn logged_in(&self, username: &str) -> TestClient {
        let mut client = self.client();
        client.login(username).await;
        let menu = client.recv().await;
        assert_eq!(menu.kind(), "menu_snapshot", "login should land in the menu");
        client.player_id = self.gateway.user_id(username);
        client
    }

    /// Admin creates a lobby and every other player joins it. All queued
    /// events are drained before returning.
    pub async fn lobby(&self, admin: &str, others: &[&str]) -> (LobbyCode, TestClient, Vec<TestClient>) {
        let mut host = self.logged_in(admin).await;
        host.send(ClientMsg::CreateLobby).await;
        let code = host
            .drain()
            .iter()
            .find_map(|m| match m {
                ServerMsg::LobbySnapshot { code, .. } => Some(code.clone()),
                _ => None,
            })
            .expect("creator receives a lobby snapshot");

        let mut guests = Vec::new();
        for name in others {
            let mut guest = self.logged_in(name).await;
            guest.send(ClientMsg::JoinLobby { code: code.clone() }).await;
            guests.push(guest);
        }
        host.drain();
        for guest in &mut guests {
            guest.drain();
        }
        (code, host, guests)
    }

    /// Admin advances out of the lobby; returns once orchestration runs and
    /// the bridge listens on the game's push endpoint.
    pub async fn start(&self, code: &LobbyCode, host: &mut TestClient) {
        host.send(ClientMsg::Advance).await;
        let endpoint = push_endpoint(&self.game(code).await.orchestrator_handle);
        for _ in 0..200 {
            if self.push.subscriber_count(&endpoint) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("bridge never subscribed to {endpoint}");
    }

    /// Publish on the game's push endpoint, as the orchestrator would.
    pub async fn publish(&self, code: &LobbyCode, target: &str, arguments: Vec<Value>) {
        let endpoint = push_endpoint(&self.game(code).await.orchestrator_handle);
        self.push
            .publish(&endpoint, PushEnvelope::new(target, arguments));
    }

    /// Copy of a registered game's current state.
    pub async fn game(&self, code: &LobbyCode) -> Game {
        let cell = self
            .coordinator
            .games()
            .get(code)
            .unwrap_or_else(|| panic!("game {code} is not registered"));
        let slot = cell.lock().await;
        slot.game.clone()
    }

    pub async fn try_game(&self, code: &LobbyCode) -> Option<Game> {
        let cell = self.coordinator.games().get(code)?;
        let slot = cell.lock().await;
        Some(slot.game.clone())
    }
}

pub struct TestClient {
    pub conn_id: ConnId,
    pub player_id: Option<PlayerId>,
    rx: mpsc::UnboundedReceiver<ServerMsg>,
    coordinator: Arc<SessionCoordinator>,
}

impl TestClient {
    pub fn id(&self) -> PlayerId {
        self.player_id.expect("client is logged in")
    }

    pub async fn send(&self, msg: ClientMsg) {
        self.coordinator.handle_intent(self.conn_id, msg).await;
    }

    pub async fn login(&self, username: &str) {
        self.send(ClientMsg::Login {
            username: username.to_string(),
            password: "password1".to_string(),
        })
        .await;
    }

    pub async fn disconnect(&self) {
        self.coordinator.disconnect(self.conn_id).await;
    }

    /// Next queued event; panics after a short timeout.
    pub async fn recv(&mut self) -> ServerMsg {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("outbound queue closed")
    }

    /// Next event, which must be of `kind`.
    pub async fn expect(&mut self, kind: &str) -> ServerMsg {
        let msg = self.recv().await;
        assert_eq!(msg.kind(), kind, "unexpected event: {msg:?}");
        msg
    }

    /// Skip events until one of `kind` arrives.
    pub async fn recv_kind(&mut self, kind: &str) -> ServerMsg {
        loop {
            let msg = self.recv().await;
            if msg.kind() == kind {
                return msg;
            }
        }
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn assert_quiet(&mut self) {
        let pending = self.drain();
        assert!(pending.is_empty(), "expected no events, got {pending:?}");
    }
}

/// Failure code carried by a `failure` event.
pub fn failure_code(msg: &ServerMsg) -> &str {
    match msg {
        ServerMsg::Failure { code, .. } => code,
        other => panic!("expected a failure event, got {other:?}"),
    }
}

pub fn notice_text(msg: &ServerMsg) -> &str {
    match msg {
        ServerMsg::Notice { message, .. } => message,
        other => panic!("expected a notice, got {other:?}"),
    }
}

//! Session coordinator: turns client intents and orchestrator events into
//! registry updates and per-player snapshot events.
//!
//! Lock discipline: a game's mutex is held for every read-modify-write of
//! that game and for the broadcast that follows, and is never held across a
//! backend gateway call. Only one game mutex is ever held at a time.

mod broadcast;
mod intents;
mod lifecycle;
mod phases;

use std::sync::{Arc, Weak};

use crate::bridge::PushChannel;
use crate::config::SessionLimits;
use crate::domain::game::LobbyCode;
use crate::domain::player::{Player, PlayerId};
use crate::domain::snapshot::Snapshot;
use crate::error::AppError;
use crate::gateway::{self, BackendGateway};
use crate::registry::{GameCell, GameRegistry, PlayerDirectory};
use crate::ws::hub::{ConnId, ConnectionRegistry, OutboundSender};

pub(crate) use broadcast::Outbound;

pub struct SessionCoordinator {
    gateway: Arc<dyn BackendGateway>,
    push: Arc<dyn PushChannel>,
    connections: ConnectionRegistry,
    players: PlayerDirectory,
    games: GameRegistry,
    limits: SessionLimits,
    this: Weak<SessionCoordinator>,
}

impl SessionCoordinator {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        push: Arc<dyn PushChannel>,
        limits: SessionLimits,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            gateway,
            push,
            connections: ConnectionRegistry::new(),
            players: PlayerDirectory::new(),
            games: GameRegistry::new(),
            limits,
            this: this.clone(),
        })
    }

    pub fn gateway(&self) -> &Arc<dyn BackendGateway> {
        &self.gateway
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn players(&self) -> &PlayerDirectory {
        &self.players
    }

    pub fn games(&self) -> &GameRegistry {
        &self.games
    }

    /// A new transport connection. Outbound events for it go to `sink`.
    pub fn connect(&self, conn_id: ConnId, sink: OutboundSender) {
        self.connections.register(conn_id, sink);
    }

    /// Snapshot for a logged-in player, reflecting the latest committed
    /// state of their game.
    pub async fn compute_snapshot(&self, player_id: PlayerId) -> Option<Snapshot> {
        match self.game_cell_of(player_id) {
            Some((_, cell)) => {
                let slot = cell.lock().await;
                let player = self.players.get(player_id)?;
                Some(self.snapshot_in(&player, Some(&slot.game)))
            }
            None => {
                let player = self.players.get(player_id)?;
                Some(self.snapshot_in(&player, None))
            }
        }
    }

    pub async fn snapshot_for_connection(&self, conn_id: ConnId) -> Snapshot {
        match self.connections.player_for(conn_id) {
            Some(player_id) => self
                .compute_snapshot(player_id)
                .await
                .unwrap_or_else(Snapshot::pre_login),
            None => Snapshot::pre_login(),
        }
    }

    fn require_player(&self, conn_id: ConnId) -> Result<Player, AppError> {
        self.connections
            .player_for(conn_id)
            .and_then(|id| self.players.get(id))
            .ok_or_else(AppError::not_logged_in)
    }

    fn game_cell_of(&self, player_id: PlayerId) -> Option<(LobbyCode, GameCell)> {
        let code = self.games.game_of(player_id)?;
        let cell = self.games.get(&code)?;
        Some((code, cell))
    }

    fn quit_in_background(&self, code: LobbyCode, player_id: PlayerId) {
        let backend = self.gateway.clone();
        gateway::best_effort("quit_game", async move {
            backend.quit_game(&code, player_id).await
        });
    }
}

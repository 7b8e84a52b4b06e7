//! Connection registry: the live bijection between transport connections and
//! logged-in players, plus each connection's outbound queue.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::player::PlayerId;
use crate::errors::domain::{ConflictKind, DomainError};
use crate::ws::protocol::ServerMsg;

pub type ConnId = Uuid;
pub type OutboundSender = mpsc::UnboundedSender<ServerMsg>;

#[derive(Default)]
struct Bindings {
    by_conn: HashMap<ConnId, PlayerId>,
    by_player: HashMap<PlayerId, ConnId>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    sinks: DashMap<ConnId, OutboundSender>,
    bindings: RwLock<Bindings>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn_id: ConnId, sink: OutboundSender) {
        self.sinks.insert(conn_id, sink);
        debug!(conn_id = %conn_id, "[WS HUB] connection registered");
    }

    /// Forget a connection. Returns the player it was bound to, if any.
    /// Dropping the sink ends the session's outbound stream.
    pub fn unregister(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.sinks.remove(&conn_id);
        let mut bindings = self.bindings.write();
        let player_id = bindings.by_conn.remove(&conn_id)?;
        bindings.by_player.remove(&player_id);
        debug!(conn_id = %conn_id, player_id, "[WS HUB] connection unregistered");
        Some(player_id)
    }

    /// Attach a player to a connection. Both sides must be free.
    pub fn bind(&self, conn_id: ConnId, player_id: PlayerId) -> Result<(), DomainError> {
        if !self.sinks.contains_key(&conn_id) {
            return Err(DomainError::conflict(
                ConflictKind::ConnectionBound,
                "Connection is no longer open",
            ));
        }
        let mut bindings = self.bindings.write();
        if bindings.by_conn.contains_key(&conn_id) {
            return Err(DomainError::conflict(
                ConflictKind::ConnectionBound,
                "This connection is already logged in",
            ));
        }
        if bindings.by_player.contains_key(&player_id) {
            return Err(DomainError::conflict(
                ConflictKind::DuplicateLogin,
                "This player already has a live connection",
            ));
        }
        bindings.by_conn.insert(conn_id, player_id);
        bindings.by_player.insert(player_id, conn_id);
        Ok(())
    }

    pub fn player_for(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.bindings.read().by_conn.get(&conn_id).copied()
    }

    pub fn conn_for(&self, player_id: PlayerId) -> Option<ConnId> {
        self.bindings.read().by_player.get(&player_id).copied()
    }

    /// Queue a message for a connection. Returns false if it is gone.
    pub fn send_to_connection(&self, conn_id: ConnId, msg: ServerMsg) -> bool {
        let Some(sink) = self.sinks.get(&conn_id) else {
            trace!(conn_id = %conn_id, "[WS HUB] dropping message for closed connection");
            return false;
        };
        sink.send(msg).is_ok()
    }

    pub fn send_to_player(&self, player_id: PlayerId, msg: ServerMsg) -> bool {
        match self.conn_for(player_id) {
            Some(conn_id) => self.send_to_connection(conn_id, msg),
            None => false,
        }
    }

    pub fn active_connections_count(&self) -> usize {
        self.sinks.len()
    }
}

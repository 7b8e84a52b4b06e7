//! Active games and the player-to-game membership index.
//!
//! Each game sits behind its own async mutex. Every mutation of a game, and
//! every event broadcast about it, happens while that mutex is held, which
//! makes the mutex the game's serialization point. Tokio's mutex is fair, so
//! waiters are served in arrival order.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::bridge::OrchestratorSubscription;
use crate::domain::game::{Game, LobbyCode};
use crate::domain::player::PlayerId;
use crate::errors::domain::{ConflictKind, DomainError};

pub struct GameSlot {
    pub game: Game,
    /// Live push subscription while orchestration runs. Dropping it stops
    /// the bridge task.
    pub subscription: Option<OrchestratorSubscription>,
}

pub type GameCell = Arc<Mutex<GameSlot>>;

#[derive(Default)]
pub struct GameRegistry {
    games: DashMap<LobbyCode, GameCell>,
    memberships: DashMap<PlayerId, LobbyCode>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new game. Rejects a code that is already in use.
    pub fn insert(&self, game: Game) -> Result<GameCell, DomainError> {
        match self.games.entry(game.code.clone()) {
            Entry::Occupied(_) => Err(DomainError::conflict(
                ConflictKind::LobbyCodeInUse,
                format!("Lobby code {} is already in use", game.code),
            )),
            Entry::Vacant(slot) => {
                let cell = Arc::new(Mutex::new(GameSlot {
                    game,
                    subscription: None,
                }));
                slot.insert(cell.clone());
                Ok(cell)
            }
        }
    }

    pub fn get(&self, code: &LobbyCode) -> Option<GameCell> {
        self.games.get(code).map(|c| c.clone())
    }

    pub fn remove(&self, code: &LobbyCode) -> Option<GameCell> {
        self.games.remove(code).map(|(_, cell)| cell)
    }

    pub fn contains(&self, code: &LobbyCode) -> bool {
        self.games.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Lobby code of the game `player_id` belongs to.
    pub fn game_of(&self, player_id: PlayerId) -> Option<LobbyCode> {
        self.memberships.get(&player_id).map(|c| c.clone())
    }

    /// Record membership. A player belongs to at most one game.
    pub fn bind(&self, player_id: PlayerId, code: &LobbyCode) -> Result<(), DomainError> {
        match self.memberships.entry(player_id) {
            Entry::Occupied(existing) if existing.get() == code => Ok(()),
            Entry::Occupied(existing) => Err(DomainError::conflict(
                ConflictKind::AlreadyInGame,
                format!("You are already in lobby {}", existing.get()),
            )),
            Entry::Vacant(slot) => {
                slot.insert(code.clone());
                Ok(())
            }
        }
    }

    /// Drop membership, but only if it still points at `code`.
    pub fn unbind(&self, player_id: PlayerId, code: &LobbyCode) {
        self.memberships.remove_if(&player_id, |_, bound| bound == code);
    }
}

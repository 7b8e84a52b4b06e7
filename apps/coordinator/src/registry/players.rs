//! Live player records, keyed by identity with a username index.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::player::{Player, PlayerId, Username};
use crate::domain::snapshot::PlayerLookup;
use crate::errors::domain::{ConflictKind, DomainError};

/// A player is present exactly while they hold a live session.
#[derive(Default)]
pub struct PlayerDirectory {
    players: DashMap<PlayerId, Player>,
    usernames: DashMap<Username, PlayerId>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self, username: &Username) -> bool {
        self.usernames.contains_key(username)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Insert a freshly logged-in player. Fails if the username or the
    /// identity already has a live session.
    pub fn insert(&self, player: Player) -> Result<(), DomainError> {
        match self.usernames.entry(player.username.clone()) {
            Entry::Occupied(_) => Err(DomainError::conflict(
                ConflictKind::DuplicateLogin,
                format!("User {} is already logged in", player.username),
            )),
            Entry::Vacant(slot) => {
                if self.players.contains_key(&player.id) {
                    return Err(DomainError::conflict(
                        ConflictKind::DuplicateLogin,
                        format!("User {} is already logged in", player.username),
                    ));
                }
                slot.insert(player.id);
                self.players.insert(player.id, player);
                Ok(())
            }
        }
    }

    pub fn remove(&self, player_id: PlayerId) -> Option<Player> {
        let (_, player) = self.players.remove(&player_id)?;
        self.usernames
            .remove_if(&player.username, |_, id| *id == player_id);
        Some(player)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<Player> {
        self.players.get(&player_id).map(|p| p.clone())
    }

    /// Mutate a player in place. Returns `None` if they are not logged in.
    pub fn update<R>(&self, player_id: PlayerId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.players.get_mut(&player_id).map(|mut p| f(p.value_mut()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerLookup for PlayerDirectory {
    fn lookup(&self, player_id: PlayerId) -> Option<Player> {
        self.get(player_id)
    }
}

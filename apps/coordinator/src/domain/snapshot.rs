//! Per-player view of the world sent with every outbound event.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::game::{Game, GamePhase, LobbyCode};
use crate::domain::player::{Guess, Player, PlayerId, UiMode, Username};

/// Read access to live player records.
pub trait PlayerLookup {
    fn lookup(&self, player_id: PlayerId) -> Option<Player>;
}

impl PlayerLookup for HashMap<PlayerId, Player> {
    fn lookup(&self, player_id: PlayerId) -> Option<Player> {
        self.get(&player_id).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub username: Username,
    /// `None` when the member has no live session.
    pub score: Option<i64>,
    pub connected: bool,
    pub is_admin: bool,
    pub has_guessed: bool,
    /// Only populated in the recipient's own view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_guess: Option<Guess>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub ui_mode: UiMode,
    pub game_phase: Option<GamePhase>,
    pub lobby_code: Option<LobbyCode>,
    pub round: Option<u32>,
    pub is_admin: bool,
    pub player: Option<PlayerView>,
    pub other_players: Vec<PlayerView>,
}

impl Snapshot {
    /// What an unauthenticated connection sees.
    pub fn pre_login() -> Self {
        Self {
            ui_mode: UiMode::PreLogin,
            game_phase: None,
            lobby_code: None,
            round: None,
            is_admin: false,
            player: None,
            other_players: Vec::new(),
        }
    }
}

/// Build the snapshot `player` should receive.
///
/// `others` is the roster minus the recipient, matched by identity, so two
/// players sharing a username never hide each other. Members without a live
/// session show up as disconnected.
pub fn compute_snapshot(
    player: &Player,
    game: Option<&Game>,
    players: &impl PlayerLookup,
) -> Snapshot {
    let game = game.filter(|g| g.is_member(player.id));

    let me = PlayerView {
        player_id: player.id,
        username: player.username.clone(),
        score: Some(player.score),
        connected: true,
        is_admin: game.is_some_and(|g| g.is_admin(player.id)),
        has_guessed: player.last_guess.is_some(),
        last_guess: player.last_guess,
    };

    let other_players = game
        .map(|g| {
            g.members()
                .iter()
                .filter(|m| m.player_id != player.id)
                .map(|m| match players.lookup(m.player_id) {
                    Some(other) => PlayerView {
                        player_id: m.player_id,
                        username: m.username.clone(),
                        score: Some(other.score),
                        connected: true,
                        is_admin: g.is_admin(m.player_id),
                        has_guessed: other.last_guess.is_some(),
                        last_guess: None,
                    },
                    None => PlayerView {
                        player_id: m.player_id,
                        username: m.username.clone(),
                        score: None,
                        connected: false,
                        is_admin: g.is_admin(m.player_id),
                        has_guessed: false,
                        last_guess: None,
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    Snapshot {
        ui_mode: player.ui_mode,
        game_phase: game.map(|g| g.phase),
        lobby_code: game.map(|g| g.code.clone()),
        round: game.map(|g| g.round_no),
        is_admin: me.is_admin,
        player: Some(me),
        other_players,
    }
}

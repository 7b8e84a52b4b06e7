//! Rendering and fan-out of outbound events.

use tracing::trace;

use super::SessionCoordinator;
use crate::domain::game::{Game, GamePhase};
use crate::domain::player::{Player, PlayerId};
use crate::domain::snapshot::{compute_snapshot, Snapshot};
use crate::error::AppError;
use crate::gateway::types::LeaderboardEntry;
use crate::ws::hub::ConnId;
use crate::ws::protocol::ServerMsg;

/// Event kind before the recipient's snapshot is attached.
#[derive(Debug, Clone)]
pub(crate) enum Outbound {
    Menu,
    Lobby,
    GuessPrompt,
    RoundEnded(String),
    Answers,
    Scores,
    UploadPrompt,
    Leaderboard(Vec<LeaderboardEntry>),
    Notice(String),
}

impl Outbound {
    /// The event that shows a member where their game currently is.
    pub(crate) fn for_phase(game: &Game) -> Self {
        match game.phase {
            GamePhase::Waiting => Outbound::Lobby,
            GamePhase::Guessing => Outbound::GuessPrompt,
            GamePhase::Results => Outbound::Answers,
            GamePhase::Leaderboard => Outbound::Scores,
            GamePhase::Concluded => Outbound::Notice("This game is over".to_string()),
        }
    }

    fn render(&self, snapshot: Snapshot, game: Option<&Game>) -> ServerMsg {
        match self {
            Outbound::Menu => ServerMsg::MenuSnapshot { snapshot },
            Outbound::Lobby => match snapshot.lobby_code.clone() {
                Some(code) => ServerMsg::LobbySnapshot { code, snapshot },
                None => ServerMsg::MenuSnapshot { snapshot },
            },
            Outbound::GuessPrompt => {
                let round = game.and_then(|g| {
                    g.location
                        .clone()
                        .map(|loc| (loc, g.settings.countdown_seconds, g.round_no))
                });
                match round {
                    Some((location, countdown_seconds, round)) => ServerMsg::GuessPrompt {
                        location,
                        countdown_seconds,
                        round,
                        snapshot,
                    },
                    None => ServerMsg::Notice {
                        message: "Waiting for the next round".to_string(),
                        snapshot,
                    },
                }
            }
            Outbound::RoundEnded(message) => ServerMsg::RoundEndedNotice {
                message: message.clone(),
                snapshot,
            },
            Outbound::Answers => ServerMsg::AnswersSnapshot {
                deltas: game.map(|g| g.last_deltas.clone()).unwrap_or_default(),
                snapshot,
            },
            Outbound::Scores => ServerMsg::ScoresSnapshot { snapshot },
            Outbound::UploadPrompt => ServerMsg::UploadPrompt { snapshot },
            Outbound::Leaderboard(entries) => ServerMsg::LeaderboardResult {
                entries: entries.clone(),
                snapshot,
            },
            Outbound::Notice(message) => ServerMsg::Notice {
                message: message.clone(),
                snapshot,
            },
        }
    }
}

impl SessionCoordinator {
    pub(super) fn snapshot_in(&self, player: &Player, game: Option<&Game>) -> Snapshot {
        compute_snapshot(player, game, &self.players)
    }

    /// Send to one member. Caller holds `game`'s lock.
    pub(super) fn emit_in(&self, game: &Game, player_id: PlayerId, outbound: &Outbound) -> bool {
        let Some(player) = self.players.get(player_id) else {
            return false;
        };
        let snapshot = self.snapshot_in(&player, Some(game));
        self.connections
            .send_to_player(player_id, outbound.render(snapshot, Some(game)))
    }

    /// Send to a player who is not (or no longer) in a game.
    pub(super) fn emit_outside(&self, player_id: PlayerId, outbound: &Outbound) -> bool {
        let Some(player) = self.players.get(player_id) else {
            return false;
        };
        let snapshot = self.snapshot_in(&player, None);
        self.connections
            .send_to_player(player_id, outbound.render(snapshot, None))
    }

    /// Send to a player, taking their game's lock if they have one. Must
    /// not be called while holding any game lock.
    pub(super) async fn emit(&self, player_id: PlayerId, outbound: &Outbound) -> bool {
        match self.game_cell_of(player_id) {
            Some((_, cell)) => {
                let slot = cell.lock().await;
                self.emit_in(&slot.game, player_id, outbound)
            }
            None => self.emit_outside(player_id, outbound),
        }
    }

    /// One event per connected member. Caller holds `game`'s lock.
    pub(super) fn broadcast(&self, game: &Game, outbound: &Outbound) -> usize {
        self.broadcast_except(game, None, outbound)
    }

    pub(super) fn broadcast_except(
        &self,
        game: &Game,
        skip: Option<PlayerId>,
        outbound: &Outbound,
    ) -> usize {
        let delivered = game
            .members()
            .iter()
            .filter(|m| Some(m.player_id) != skip)
            .filter(|m| self.emit_in(game, m.player_id, outbound))
            .count();
        trace!(lobby = %game.code, delivered, "[COORDINATOR] broadcast");
        delivered
    }

    /// Tell every member about a join or leave by `subject`.
    ///
    /// In the lobby everyone gets the refreshed lobby snapshot. Mid-game the
    /// subject gets the current phase event and the rest get a notice.
    pub(super) fn announce_roster_change(&self, game: &Game, subject: PlayerId, message: String) {
        if game.phase == GamePhase::Waiting {
            self.broadcast(game, &Outbound::Lobby);
            return;
        }
        if game.is_member(subject) {
            self.emit_in(game, subject, &Outbound::for_phase(game));
        }
        self.broadcast_except(game, Some(subject), &Outbound::Notice(message));
    }

    pub(super) async fn report_failure(&self, conn_id: ConnId, err: &AppError) {
        let snapshot = self.snapshot_for_connection(conn_id).await;
        self.connections.send_to_connection(
            conn_id,
            ServerMsg::Failure {
                code: err.code().as_str().to_string(),
                message: err.client_message(),
                snapshot,
            },
        );
    }
}

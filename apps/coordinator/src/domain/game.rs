use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::player::{PlayerId, Username};
use crate::errors::domain::{ConflictKind, DomainError};

pub const DEFAULT_ROUNDS: u32 = 5;
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 30;
pub const DEFAULT_MAX_PLAYERS: u32 = 8;

/// Backend-issued lobby code. Unique among registered games.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyCode(String);

impl LobbyCode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,
    Guessing,
    Results,
    Leaderboard,
    Concluded,
}

impl GamePhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            GamePhase::Waiting => "waiting",
            GamePhase::Guessing => "guessing",
            GamePhase::Results => "results",
            GamePhase::Leaderboard => "leaderboard",
            GamePhase::Concluded => "concluded",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Concluded)
    }
}

/// Match settings as returned by the backend.
///
/// Keys the coordinator does not interpret are kept in `extra` and passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSettings {
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_countdown", alias = "countdown")]
    pub countdown_seconds: u32,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_rounds() -> u32 {
    DEFAULT_ROUNDS
}

fn default_countdown() -> u32 {
    DEFAULT_COUNTDOWN_SECONDS
}

fn default_max_players() -> u32 {
    DEFAULT_MAX_PLAYERS
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            max_players: DEFAULT_MAX_PLAYERS,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundLocation {
    pub location_id: String,
    pub image_url: String,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub player_id: PlayerId,
    pub username: Username,
}

impl Member {
    pub fn new(player_id: PlayerId, username: Username) -> Self {
        Self { player_id, username }
    }
}

/// Progress of the backend's round orchestration for a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Orchestration {
    Idle,
    /// Start requested, waiting for the backend to confirm.
    Starting,
    Running {
        orchestrator_id: String,
        subscription_endpoint: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub player: Username,
    pub delta: i64,
}

/// Result of removing a member from the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub member: Member,
    pub was_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub code: LobbyCode,
    /// Backend handle used to start orchestration and finalize results.
    pub orchestrator_handle: String,
    pub settings: MatchSettings,
    pub phase: GamePhase,
    pub location: Option<RoundLocation>,
    pub round_no: u32,
    pub orchestration: Orchestration,
    pub last_deltas: Vec<ScoreDelta>,
    admin: Option<PlayerId>,
    members: Vec<Member>,
}

impl Game {
    /// New game in `Waiting` with the creator as its only member and admin.
    pub fn new(
        code: LobbyCode,
        orchestrator_handle: impl Into<String>,
        settings: MatchSettings,
        creator: Member,
    ) -> Self {
        Self {
            code,
            orchestrator_handle: orchestrator_handle.into(),
            settings,
            phase: GamePhase::Waiting,
            location: None,
            round_no: 0,
            orchestration: Orchestration::Idle,
            last_deltas: Vec::new(),
            admin: Some(creator.player_id),
            members: vec![creator],
        }
    }

    pub fn admin(&self) -> Option<PlayerId> {
        self.admin
    }

    pub fn is_admin(&self, player_id: PlayerId) -> bool {
        self.admin == Some(player_id)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.player_id).collect()
    }

    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.members.iter().any(|m| m.player_id == player_id)
    }

    pub fn member_by_username(&self, username: &Username) -> Option<&Member> {
        self.members.iter().find(|m| &m.username == username)
    }

    pub fn is_full(&self) -> bool {
        self.settings.max_players > 0 && self.members.len() >= self.settings.max_players as usize
    }

    pub fn is_orchestration_running(&self) -> bool {
        matches!(self.orchestration, Orchestration::Running { .. })
    }

    pub fn add_member(&mut self, member: Member) -> Result<(), DomainError> {
        if self.is_member(member.player_id) {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyMember,
                format!("{} is already in lobby {}", member.username, self.code),
            ));
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove by identity. Clears the admin slot if the admin leaves; the
    /// role is never handed to someone else.
    pub fn remove_member(&mut self, player_id: PlayerId) -> Option<Departure> {
        let idx = self.members.iter().position(|m| m.player_id == player_id)?;
        let member = self.members.remove(idx);
        let was_admin = self.admin == Some(player_id);
        if was_admin {
            self.admin = None;
        }
        Some(Departure { member, was_admin })
    }

    /// A game nobody can reach any more: empty and never started.
    pub fn is_abandoned(&self) -> bool {
        self.members.is_empty()
            && self.phase == GamePhase::Waiting
            && self.orchestration == Orchestration::Idle
    }
}

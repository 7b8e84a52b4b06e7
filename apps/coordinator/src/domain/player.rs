use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

/// Stable player identity, issued by the backend at login.
pub type PlayerId = i64;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 26;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 26;

/// Which screen a player's client is on. Independent of game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    PreLogin,
    Menu,
    InGame,
    Uploading,
}

/// Trimmed, lower-cased username. Normalized on every construction path,
/// deserialization included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|raw| Self::normalize(&raw))
    }
}

impl Username {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length checks applied before credentials go to the backend.
pub fn validate_credentials(username: &Username, password: &str) -> Result<(), DomainError> {
    let name_len = username.as_str().chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&name_len) {
        return Err(DomainError::validation(
            ValidationKind::Username,
            format!(
                "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
            ),
        ));
    }
    let pass_len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&pass_len) {
        return Err(DomainError::validation(
            ValidationKind::Password,
            format!(
                "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub lat: f64,
    pub lon: f64,
}

/// A logged-in player. Exists only while the player has a live connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub username: Username,
    pub score: i64,
    pub last_guess: Option<Guess>,
    pub ui_mode: UiMode,
}

impl Player {
    pub fn logged_in(id: PlayerId, username: Username) -> Self {
        Self {
            id,
            username,
            score: 0,
            last_guess: None,
            ui_mode: UiMode::Menu,
        }
    }

    /// Scores are per match.
    pub fn reset_for_match(&mut self) {
        self.score = 0;
        self.last_guess = None;
    }

    pub fn apply_delta(&mut self, delta: i64) {
        self.score = self.score.saturating_add(delta);
    }
}

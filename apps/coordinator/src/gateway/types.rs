//! Request and response payloads exchanged with the game backend.

use serde::{Deserialize, Serialize};

use crate::domain::game::{LobbyCode, MatchSettings};
use crate::domain::player::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    pub user_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLobby {
    pub lobby_code: LobbyCode,
    /// Opaque id the orchestrator knows this game by.
    pub orchestrator_handle: String,
    #[serde(default)]
    pub settings: MatchSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedGame {
    #[serde(default)]
    pub settings: Option<MatchSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationStarted {
    pub orchestrator_id: String,
    /// Push channel the orchestrator publishes this game's events on.
    pub subscription_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub location_id: String,
    pub image_url: String,
}

/// Describes an uploaded photo's place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMetadata {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub metadata: LocationMetadata,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardQuery {
    Global,
    Lobby(LobbyCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
}

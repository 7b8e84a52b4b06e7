use serde::{Deserialize, Serialize};

use crate::domain::game::{LobbyCode, RoundLocation, ScoreDelta};
use crate::domain::snapshot::Snapshot;
use crate::gateway::types::{LeaderboardEntry, LocationMetadata};

pub const PROTOCOL_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardScope {
    #[default]
    Global,
    Lobby,
}

/// Intents sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Hello {
        protocol: i32,
    },
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        password: String,
    },
    CreateLobby,
    JoinLobby {
        code: LobbyCode,
    },
    ReturnToMenu,
    EnterUpload,
    SubmitUpload {
        metadata: LocationMetadata,
        /// Base64-encoded image bytes.
        image: String,
    },
    RequestLeaderboard {
        #[serde(default)]
        scope: LeaderboardScope,
        #[serde(default)]
        limit: Option<u32>,
    },
    SubmitGuess {
        lat: f64,
        lon: f64,
    },
    Advance,
}

impl ClientMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::Hello { .. } => "hello",
            ClientMsg::Login { .. } => "login",
            ClientMsg::Register { .. } => "register",
            ClientMsg::CreateLobby => "create_lobby",
            ClientMsg::JoinLobby { .. } => "join_lobby",
            ClientMsg::ReturnToMenu => "return_to_menu",
            ClientMsg::EnterUpload => "enter_upload",
            ClientMsg::SubmitUpload { .. } => "submit_upload",
            ClientMsg::RequestLeaderboard { .. } => "request_leaderboard",
            ClientMsg::SubmitGuess { .. } => "submit_guess",
            ClientMsg::Advance => "advance",
        }
    }
}

/// Events sent to clients. Every game-level event carries the recipient's
/// full snapshot.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HelloAck {
        protocol: i32,
    },
    MenuSnapshot {
        snapshot: Snapshot,
    },
    LobbySnapshot {
        code: LobbyCode,
        snapshot: Snapshot,
    },
    GuessPrompt {
        location: RoundLocation,
        countdown_seconds: u32,
        round: u32,
        snapshot: Snapshot,
    },
    RoundEndedNotice {
        message: String,
        snapshot: Snapshot,
    },
    AnswersSnapshot {
        deltas: Vec<ScoreDelta>,
        snapshot: Snapshot,
    },
    ScoresSnapshot {
        snapshot: Snapshot,
    },
    UploadPrompt {
        snapshot: Snapshot,
    },
    LeaderboardResult {
        entries: Vec<LeaderboardEntry>,
        snapshot: Snapshot,
    },
    Failure {
        code: String,
        message: String,
        snapshot: Snapshot,
    },
    Notice {
        message: String,
        snapshot: Snapshot,
    },
    /// Transport-level problem with a frame; not tied to game state.
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::HelloAck { .. } => "hello_ack",
            ServerMsg::MenuSnapshot { .. } => "menu_snapshot",
            ServerMsg::LobbySnapshot { .. } => "lobby_snapshot",
            ServerMsg::GuessPrompt { .. } => "guess_prompt",
            ServerMsg::RoundEndedNotice { .. } => "round_ended_notice",
            ServerMsg::AnswersSnapshot { .. } => "answers_snapshot",
            ServerMsg::ScoresSnapshot { .. } => "scores_snapshot",
            ServerMsg::UploadPrompt { .. } => "upload_prompt",
            ServerMsg::LeaderboardResult { .. } => "leaderboard_result",
            ServerMsg::Failure { .. } => "failure",
            ServerMsg::Notice { .. } => "notice",
            ServerMsg::Error { .. } => "error",
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            ServerMsg::HelloAck { .. } | ServerMsg::Error { .. } => None,
            ServerMsg::MenuSnapshot { snapshot }
            | ServerMsg::LobbySnapshot { snapshot, .. }
            | ServerMsg::GuessPrompt { snapshot, .. }
            | ServerMsg::RoundEndedNotice { snapshot, .. }
            | ServerMsg::AnswersSnapshot { snapshot, .. }
            | ServerMsg::ScoresSnapshot { snapshot }
            | ServerMsg::UploadPrompt { snapshot }
            | ServerMsg::LeaderboardResult { snapshot, .. }
            | ServerMsg::Failure { snapshot, .. }
            | ServerMsg::Notice { snapshot, .. } => Some(snapshot),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadProtocol,
    BadRequest,
}

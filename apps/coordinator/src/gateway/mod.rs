//! Backend gateway: every request the coordinator makes to the game backend.
//!
//! Calls come in two modes. Required calls are awaited and their outcome
//! decides what the player sees. Best-effort calls run detached through
//! [`best_effort`]; their failures are logged and never reach a player.

pub mod http;
pub mod types;

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::domain::game::LobbyCode;
use crate::domain::player::{Guess, PlayerId, Username};
use types::{
    CreatedLobby, ImageUpload, JoinedGame, LeaderboardEntry, LeaderboardQuery, LocationRecord,
    LoginGrant, OrchestrationStarted, UploadedImage,
};

pub use http::HttpBackendGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response: connect failure, timeout or dropped connection.
    #[error("backend unreachable during {operation}: {detail}")]
    Unreachable {
        operation: &'static str,
        detail: String,
    },
    /// The backend answered `result: false`.
    #[error("backend rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
    /// The backend answered with something that is not a valid reply.
    #[error("unexpected backend response for {operation}: {detail}")]
    Protocol {
        operation: &'static str,
        detail: String,
    },
}

impl GatewayError {
    pub fn operation(&self) -> &'static str {
        match self {
            GatewayError::Unreachable { operation, .. }
            | GatewayError::Rejected { operation, .. }
            | GatewayError::Protocol { operation, .. } => operation,
        }
    }
}

#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn register(&self, username: &Username, password: &str) -> Result<(), GatewayError>;

    async fn login(&self, username: &Username, password: &str) -> Result<LoginGrant, GatewayError>;

    async fn create_lobby(&self, player_id: PlayerId) -> Result<CreatedLobby, GatewayError>;

    async fn join_game(
        &self,
        code: &LobbyCode,
        player_id: PlayerId,
    ) -> Result<JoinedGame, GatewayError>;

    async fn quit_game(&self, code: &LobbyCode, player_id: PlayerId) -> Result<(), GatewayError>;

    async fn submit_guess(
        &self,
        code: &LobbyCode,
        player_id: PlayerId,
        guess: Guess,
    ) -> Result<(), GatewayError>;

    async fn get_location(&self, location_id: &str) -> Result<LocationRecord, GatewayError>;

    async fn get_leaderboard(
        &self,
        query: &LeaderboardQuery,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError>;

    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedImage, GatewayError>;

    async fn start_round_orchestration(
        &self,
        orchestrator_handle: &str,
        rounds: u32,
        countdown_seconds: u32,
    ) -> Result<OrchestrationStarted, GatewayError>;

    async fn finalize_results(&self, orchestrator_handle: &str) -> Result<(), GatewayError>;

    async fn health_check(&self) -> Result<(), GatewayError>;
}

/// Run a gateway call without waiting for it. Failures are logged only.
pub fn best_effort<F>(operation: &'static str, call: F)
where
    F: Future<Output = Result<(), GatewayError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = call.await {
            warn!(operation, error = %err, "[GATEWAY] best-effort call failed");
        }
    });
}

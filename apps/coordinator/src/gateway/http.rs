//! REST implementation of [`BackendGateway`].
//!
//! Every backend reply is a JSON object carrying `result` (bool) and `msg`
//! (string) next to the operation's own fields.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::domain::game::LobbyCode;
use crate::domain::player::{Guess, PlayerId, Username};
use crate::error::AppError;
use crate::gateway::types::{
    CreatedLobby, ImageUpload, JoinedGame, LeaderboardEntry, LeaderboardPage, LeaderboardQuery,
    LocationRecord, LoginGrant, OrchestrationStarted, UploadedImage,
};
use crate::gateway::{BackendGateway, GatewayError};

const FUNCTION_KEY_HEADER: &str = "x-functions-key";

// Connect-failure retry (the request never reached the backend)
const RETRY_INITIAL_DELAY_MS: u64 = 50;
const RETRY_MAX_DELAY_MS: u64 = 200;

pub struct HttpBackendGateway {
    client: Client,
    base_url: String,
    function_key: Option<String>,
    max_attempts: u32,
}

impl HttpBackendGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|err| AppError::config(format!("Failed to build backend client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            function_key: config.function_key.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Send one request and return the raw status and body.
    ///
    /// Only connect failures are retried. Once a request may have reached
    /// the backend it is never sent again.
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<(u16, Vec<u8>), GatewayError> {
        let url = self.url(path);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let mut request = self.client.request(method.clone(), &url);
            if let Some(key) = &self.function_key {
                request = request.header(FUNCTION_KEY_HEADER, key);
            }
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let bytes = response.bytes().await.map_err(|err| {
                        GatewayError::Unreachable {
                            operation,
                            detail: format!("failed to read response body: {err}"),
                        }
                    })?;
                    debug!(operation, status, attempt, "[GATEWAY] backend replied");
                    return Ok((status, bytes.to_vec()));
                }
                Err(err) if err.is_connect() && attempt < self.max_attempts => {
                    let delay_ms = retry_delay_ms(attempt);
                    warn!(
                        operation,
                        attempt,
                        retry_delay_ms = delay_ms,
                        error = %err,
                        "[GATEWAY] backend connect failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    return Err(GatewayError::Unreachable {
                        operation,
                        detail: err.to_string(),
                    })
                }
            }
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, GatewayError> {
        let (status, bytes) = self.send(operation, method, path, query, body).await?;
        interpret_response(operation, status, &bytes)
    }

    async fn ack(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), GatewayError> {
        let _: IgnoredAny = self.call(operation, method, path, &[], body).await?;
        Ok(())
    }
}

/// Backoff before retry number `attempt` (1-based), capped.
fn retry_delay_ms(attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    RETRY_INITIAL_DELAY_MS
        .saturating_mul(factor)
        .min(RETRY_MAX_DELAY_MS)
}

/// The health endpoint answers a bare status document, not the
/// `{result,msg}` envelope. Any 2xx counts as healthy.
pub(crate) fn interpret_health(status: u16, body: &[u8]) -> Result<(), GatewayError> {
    const OPERATION: &str = "health_check";
    if (200..300).contains(&status) {
        return Ok(());
    }
    match interpret_response::<IgnoredAny>(OPERATION, status, body) {
        Err(err @ GatewayError::Rejected { .. }) => Err(err),
        _ => Err(GatewayError::Protocol {
            operation: OPERATION,
            detail: format!("health check answered status {status}"),
        }),
    }
}

/// Turn a raw reply into the operation's payload.
pub(crate) fn interpret_response<T: DeserializeOwned>(
    operation: &'static str,
    status: u16,
    body: &[u8],
) -> Result<T, GatewayError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| GatewayError::Protocol {
        operation,
        detail: format!("status {status}, body is not JSON: {err}"),
    })?;

    let Some(result) = value.get("result").and_then(Value::as_bool) else {
        return Err(GatewayError::Protocol {
            operation,
            detail: format!("status {status}, reply has no result flag"),
        });
    };

    if !result {
        let message = value
            .get("msg")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Request was rejected")
            .to_string();
        return Err(GatewayError::Rejected { operation, message });
    }

    if !(200..300).contains(&status) {
        return Err(GatewayError::Protocol {
            operation,
            detail: format!("status {status} with a success flag"),
        });
    }

    serde_json::from_value(value).map_err(|err| GatewayError::Protocol {
        operation,
        detail: format!("reply does not match the expected shape: {err}"),
    })
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    async fn register(&self, username: &Username, password: &str) -> Result<(), GatewayError> {
        let body = json!({ "username": username, "password": password });
        self.ack("register", Method::POST, "register", Some(body)).await
    }

    async fn login(&self, username: &Username, password: &str) -> Result<LoginGrant, GatewayError> {
        let body = json!({ "username": username, "password": password });
        self.call("login", Method::POST, "login", &[], Some(body)).await
    }

    async fn create_lobby(&self, player_id: PlayerId) -> Result<CreatedLobby, GatewayError> {
        let body = json!({ "playerId": player_id });
        self.call("create_lobby", Method::POST, "lobbies", &[], Some(body))
            .await
    }

    async fn join_game(
        &self,
        code: &LobbyCode,
        player_id: PlayerId,
    ) -> Result<JoinedGame, GatewayError> {
        let body = json!({ "playerId": player_id });
        let path = format!("lobbies/{code}/join");
        self.call("join_game", Method::POST, &path, &[], Some(body))
            .await
    }

    async fn quit_game(&self, code: &LobbyCode, player_id: PlayerId) -> Result<(), GatewayError> {
        let body = json!({ "playerId": player_id });
        let path = format!("lobbies/{code}/quit");
        self.ack("quit_game", Method::POST, &path, Some(body)).await
    }

    async fn submit_guess(
        &self,
        code: &LobbyCode,
        player_id: PlayerId,
        guess: Guess,
    ) -> Result<(), GatewayError> {
        let body = json!({ "playerId": player_id, "lat": guess.lat, "lon": guess.lon });
        let path = format!("lobbies/{code}/guesses");
        self.ack("submit_guess", Method::POST, &path, Some(body))
            .await
    }

    async fn get_location(&self, location_id: &str) -> Result<LocationRecord, GatewayError> {
        let path = format!("locations/{location_id}");
        self.call("get_location", Method::GET, &path, &[], None)
            .await
    }

    async fn get_leaderboard(
        &self,
        query: &LeaderboardQuery,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let mut params = vec![("limit", limit.to_string())];
        match query {
            LeaderboardQuery::Global => params.push(("scope", "global".to_string())),
            LeaderboardQuery::Lobby(code) => {
                params.push(("scope", "lobby".to_string()));
                params.push(("lobby", code.to_string()));
            }
        }
        let page: LeaderboardPage = self
            .call("get_leaderboard", Method::GET, "leaderboard", &params, None)
            .await?;
        Ok(page.entries)
    }

    async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedImage, GatewayError> {
        let body = json!({
            "metadata": upload.metadata,
            "image": base64::engine::general_purpose::STANDARD.encode(&upload.bytes),
        });
        self.call("upload_image", Method::POST, "images", &[], Some(body))
            .await
    }

    async fn start_round_orchestration(
        &self,
        orchestrator_handle: &str,
        rounds: u32,
        countdown_seconds: u32,
    ) -> Result<OrchestrationStarted, GatewayError> {
        let body = json!({
            "game_id": orchestrator_handle,
            "rounds": rounds,
            "countdown": countdown_seconds,
        });
        self.call(
            "start_round_orchestration",
            Method::POST,
            "start_game_trigger",
            &[],
            Some(body),
        )
        .await
    }

    async fn finalize_results(&self, orchestrator_handle: &str) -> Result<(), GatewayError> {
        let path = format!("games/{orchestrator_handle}/finalize");
        self.ack("finalize_results", Method::POST, &path, None)
            .await
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let (status, bytes) = self
            .send("health_check", Method::GET, "health_check", &[], None)
            .await?;
        interpret_health(status, &bytes)
    }
}

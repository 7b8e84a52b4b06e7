//! Login, lobby membership, uploads, leaderboards, guesses and disconnects.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info, warn};

use super::{Outbound, SessionCoordinator};
use crate::domain::game::{Game, GamePhase, LobbyCode, Member};
use crate::domain::player::{validate_credentials, Guess, Player, PlayerId, UiMode, Username};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::gateway::types::{ImageUpload, LeaderboardQuery, LocationMetadata};
use crate::ws::hub::ConnId;
use crate::ws::protocol::{LeaderboardScope, ServerMsg};

pub(super) const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

impl SessionCoordinator {
    pub async fn login(
        &self,
        conn_id: ConnId,
        username: &str,
        password: &str,
    ) -> Result<(), AppError> {
        if self.connections.player_for(conn_id).is_some() {
            return Err(AppError::conflict(
                ErrorCode::AlreadyLoggedIn,
                "This connection is already logged in",
            ));
        }

        let username = Username::normalize(username);
        if username.is_empty() {
            return Err(AppError::invalid(
                ErrorCode::InvalidUsername,
                "Username must not be empty",
            ));
        }
        if self.players.is_logged_in(&username) {
            return Err(AppError::DuplicateLogin {
                username: username.to_string(),
            });
        }

        let grant = self.gateway.login(&username, password).await?;
        let player_id = grant.user_id;

        // A concurrent login for the same name may have won while we waited.
        self.players
            .insert(Player::logged_in(player_id, username.clone()))?;
        if let Err(err) = self.connections.bind(conn_id, player_id) {
            self.players.remove(player_id);
            return Err(err.into());
        }

        info!(conn_id = %conn_id, player_id, username = %username, "[COORDINATOR] logged in");

        match self.game_cell_of(player_id) {
            Some((_, cell)) => {
                let slot = cell.lock().await;
                self.emit_in(&slot.game, player_id, &Outbound::Menu);
                if slot.game.is_member(player_id) {
                    self.broadcast_except(
                        &slot.game,
                        Some(player_id),
                        &Outbound::Notice(format!("{username} reconnected")),
                    );
                }
            }
            None => {
                self.emit_outside(player_id, &Outbound::Menu);
            }
        }
        Ok(())
    }

    pub async fn register(
        &self,
        conn_id: ConnId,
        username: &str,
        password: &str,
    ) -> Result<(), AppError> {
        let username = Username::normalize(username);
        validate_credentials(&username, password)?;
        self.gateway.register(&username, password).await?;

        debug!(username = %username, "[COORDINATOR] registered");
        let snapshot = self.snapshot_for_connection(conn_id).await;
        self.connections.send_to_connection(
            conn_id,
            ServerMsg::Notice {
                message: format!("Account {username} created, you can log in now"),
                snapshot,
            },
        );
        Ok(())
    }

    pub async fn create_lobby(&self, conn_id: ConnId) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        if let Some(code) = self.games.game_of(player.id) {
            return Err(AppError::conflict(
                ErrorCode::AlreadyInGame,
                format!("You are already in lobby {code}"),
            ));
        }

        let created = self.gateway.create_lobby(player.id).await?;
        let code = created.lobby_code.clone();

        if !self.players.contains(player.id) {
            // Disconnected while the backend was creating the lobby.
            self.quit_in_background(code, player.id);
            return Ok(());
        }

        if let Err(err) = self.games.bind(player.id, &code) {
            self.quit_in_background(code, player.id);
            return Err(err.into());
        }
        let game = Game::new(
            code.clone(),
            created.orchestrator_handle,
            created.settings,
            Member::new(player.id, player.username.clone()),
        );
        let cell = match self.games.insert(game) {
            Ok(cell) => cell,
            Err(err) => {
                self.games.unbind(player.id, &code);
                self.quit_in_background(code, player.id);
                return Err(err.into());
            }
        };

        let slot = cell.lock().await;
        self.players.update(player.id, |p| {
            p.reset_for_match();
            p.ui_mode = UiMode::InGame;
        });
        info!(lobby = %code, admin = player.id, "[COORDINATOR] lobby created");

        self.emit_in(
            &slot.game,
            player.id,
            &Outbound::Notice(format!("Lobby {code} created")),
        );
        self.broadcast(&slot.game, &Outbound::Lobby);
        Ok(())
    }

    pub async fn join_lobby(&self, conn_id: ConnId, code: LobbyCode) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;

        match self.games.game_of(player.id) {
            Some(current) if current == code => return self.resume_game(player.id).await,
            Some(current) => {
                return Err(AppError::conflict(
                    ErrorCode::AlreadyInGame,
                    format!("You are already in lobby {current}"),
                ))
            }
            None => {}
        }

        {
            let cell = self
                .games
                .get(&code)
                .ok_or_else(|| AppError::lobby_not_found(&code))?;
            let slot = cell.lock().await;
            check_joinable(&slot.game)?;
        }

        let joined = self.gateway.join_game(&code, player.id).await?;

        let Some(cell) = self.games.get(&code) else {
            self.quit_in_background(code.clone(), player.id);
            return Err(AppError::lobby_not_found(&code));
        };
        let mut slot = cell.lock().await;

        let admitted = check_joinable(&slot.game)
            .and_then(|()| {
                if self.players.contains(player.id) {
                    Ok(())
                } else {
                    Err(AppError::not_logged_in())
                }
            })
            .and_then(|()| self.games.bind(player.id, &code).map_err(AppError::from));
        if let Err(err) = admitted {
            drop(slot);
            self.quit_in_background(code, player.id);
            return Err(err);
        }

        if let Some(settings) = joined.settings {
            slot.game.settings = settings;
        }
        if let Err(err) = slot
            .game
            .add_member(Member::new(player.id, player.username.clone()))
        {
            self.games.unbind(player.id, &code);
            drop(slot);
            self.quit_in_background(code, player.id);
            return Err(err.into());
        }

        self.players.update(player.id, |p| {
            p.reset_for_match();
            p.ui_mode = UiMode::InGame;
        });
        info!(lobby = %code, player_id = player.id, "[COORDINATOR] joined");

        self.announce_roster_change(
            &slot.game,
            player.id,
            format!("{} joined the game", player.username),
        );
        Ok(())
    }

    /// Back into a game the player is still a member of, e.g. after a
    /// reconnect.
    async fn resume_game(&self, player_id: PlayerId) -> Result<(), AppError> {
        let Some((code, cell)) = self.game_cell_of(player_id) else {
            return Err(AppError::not_in_game());
        };
        let slot = cell.lock().await;
        if !slot.game.is_member(player_id) {
            self.games.unbind(player_id, &code);
            return Err(AppError::not_in_game());
        }
        self.players
            .update(player_id, |p| p.ui_mode = UiMode::InGame);
        debug!(lobby = %code, player_id, "[COORDINATOR] resumed");
        self.emit_in(&slot.game, player_id, &Outbound::for_phase(&slot.game));
        Ok(())
    }

    pub async fn return_to_menu(&self, conn_id: ConnId) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;

        let Some((code, cell)) = self.game_cell_of(player.id) else {
            self.players.update(player.id, |p| p.ui_mode = UiMode::Menu);
            self.emit_outside(player.id, &Outbound::Menu);
            return Ok(());
        };

        {
            let mut slot = cell.lock().await;
            let departure = slot.game.remove_member(player.id);
            self.games.unbind(player.id, &code);
            self.players.update(player.id, |p| {
                p.ui_mode = UiMode::Menu;
                p.last_guess = None;
            });

            if departure.as_ref().is_some_and(|d| d.was_admin) && !slot.game.members().is_empty()
            {
                warn!(lobby = %code, player_id = player.id, "[COORDINATOR] admin left, game has no admin");
            }

            if slot.game.is_abandoned() {
                let subscription = slot.subscription.take();
                self.games.remove(&code);
                drop(subscription);
                info!(lobby = %code, "[COORDINATOR] empty lobby removed");
            } else if departure.is_some() {
                self.announce_roster_change(
                    &slot.game,
                    player.id,
                    format!("{} left the game", player.username),
                );
            }

            self.emit_outside(player.id, &Outbound::Menu);
        }

        self.quit_in_background(code, player.id);
        Ok(())
    }

    pub async fn enter_upload(&self, conn_id: ConnId) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        if self.games.game_of(player.id).is_some() {
            return Err(AppError::bad_request(
                ErrorCode::WrongMode,
                "Leave your game before uploading a location",
            ));
        }
        self.players
            .update(player.id, |p| p.ui_mode = UiMode::Uploading);
        self.emit_outside(player.id, &Outbound::UploadPrompt);
        Ok(())
    }

    pub async fn submit_upload(
        &self,
        conn_id: ConnId,
        metadata: LocationMetadata,
        image: &str,
    ) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        if player.ui_mode != UiMode::Uploading {
            return Err(AppError::bad_request(
                ErrorCode::WrongMode,
                "Open the upload screen first",
            ));
        }

        let bytes = decode_image(image, self.limits.max_upload_bytes)?;
        validate_metadata(&metadata)?;

        let uploaded = self
            .gateway
            .upload_image(&ImageUpload { metadata, bytes })
            .await?;

        self.players.update(player.id, |p| {
            if p.ui_mode == UiMode::Uploading {
                p.ui_mode = UiMode::Menu;
            }
        });
        info!(player_id = player.id, url = %uploaded.image_url, "[COORDINATOR] upload stored");
        self.emit(
            player.id,
            &Outbound::Notice(format!("Upload complete: {}", uploaded.image_url)),
        )
        .await;
        Ok(())
    }

    pub async fn request_leaderboard(
        &self,
        conn_id: ConnId,
        scope: LeaderboardScope,
        limit: Option<u32>,
    ) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, self.limits.leaderboard_max_limit.max(1));
        let query = match scope {
            LeaderboardScope::Global => LeaderboardQuery::Global,
            LeaderboardScope::Lobby => LeaderboardQuery::Lobby(
                self.games
                    .game_of(player.id)
                    .ok_or_else(AppError::not_in_game)?,
            ),
        };

        let entries = self.gateway.get_leaderboard(&query, limit).await?;
        self.emit(player.id, &Outbound::Leaderboard(entries)).await;
        Ok(())
    }

    pub async fn submit_guess(&self, conn_id: ConnId, guess: Guess) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        let code = self
            .games
            .game_of(player.id)
            .ok_or_else(AppError::not_in_game)?;

        self.gateway.submit_guess(&code, player.id, guess).await?;

        let Some(cell) = self.games.get(&code) else {
            return Ok(());
        };
        let slot = cell.lock().await;
        if slot.game.is_member(player.id) {
            self.players
                .update(player.id, |p| p.last_guess = Some(guess));
            self.emit_in(
                &slot.game,
                player.id,
                &Outbound::Notice("Guess submitted".to_string()),
            );
        }
        Ok(())
    }

    /// Connection closed. The player leaves the directory but keeps their
    /// game membership so they can come back.
    pub async fn disconnect(&self, conn_id: ConnId) {
        let Some(player_id) = self.connections.unregister(conn_id) else {
            debug!(conn_id = %conn_id, "[COORDINATOR] anonymous connection closed");
            return;
        };

        match self.game_cell_of(player_id) {
            Some((code, cell)) => {
                let slot = cell.lock().await;
                let removed = self.players.remove(player_id);
                if let Some(player) = removed {
                    info!(lobby = %code, player_id, "[COORDINATOR] member disconnected");
                    self.broadcast(
                        &slot.game,
                        &Outbound::Notice(format!("{} disconnected", player.username)),
                    );
                }
            }
            None => {
                self.players.remove(player_id);
                info!(player_id, "[COORDINATOR] logged out");
            }
        }
    }
}

fn check_joinable(game: &Game) -> Result<(), AppError> {
    if game.phase == GamePhase::Concluded {
        return Err(AppError::conflict(
            ErrorCode::LobbyConcluded,
            format!("Lobby {} has already finished", game.code),
        ));
    }
    if game.is_full() {
        return Err(AppError::conflict(
            ErrorCode::LobbyFull,
            format!("Lobby {} is full", game.code),
        ));
    }
    Ok(())
}

fn decode_image(image: &str, max_bytes: usize) -> Result<Vec<u8>, AppError> {
    let bytes = STANDARD.decode(image.trim()).map_err(|err| {
        AppError::invalid(
            ErrorCode::InvalidUpload,
            format!("Image is not valid base64: {err}"),
        )
    })?;
    if bytes.is_empty() {
        return Err(AppError::invalid(ErrorCode::InvalidUpload, "Image is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::invalid(
            ErrorCode::InvalidUpload,
            format!("Image is larger than {max_bytes} bytes"),
        ));
    }
    Ok(bytes)
}

fn validate_metadata(metadata: &LocationMetadata) -> Result<(), AppError> {
    if metadata.name.trim().is_empty() {
        return Err(AppError::invalid(
            ErrorCode::InvalidUpload,
            "Location name must not be empty",
        ));
    }
    if !(-90.0..=90.0).contains(&metadata.lat) || !(-180.0..=180.0).contains(&metadata.lon) {
        return Err(AppError::invalid(
            ErrorCode::InvalidUpload,
            "Coordinates are out of range",
        ));
    }
    Ok(())
}

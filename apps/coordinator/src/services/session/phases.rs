//! Admin advances and orchestrator-driven phase changes.

use std::sync::Weak;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::{Outbound, SessionCoordinator};
use crate::bridge::{LocationRef, OrchestratorEvent, OrchestratorSink, OrchestratorSubscription};
use crate::domain::game::{
    GamePhase, LobbyCode, Member, Orchestration, RoundLocation, ScoreDelta,
};
use crate::domain::player::UiMode;
use crate::domain::transition::{next_phase, plan_advance, AdvancePlan};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::ws::hub::ConnId;

const DEFAULT_ROUND_END_MESSAGE: &str = "Time is up!";
const DEFAULT_GAME_OVER_MESSAGE: &str = "Game over";
const FINALIZE_RETRY_ATTEMPTS: u32 = 3;

impl SessionCoordinator {
    pub async fn advance(&self, conn_id: ConnId) -> Result<(), AppError> {
        let player = self.require_player(conn_id)?;
        let (code, cell) = self
            .game_cell_of(player.id)
            .ok_or_else(AppError::not_in_game)?;

        let (handle, rounds, countdown) = {
            let mut slot = cell.lock().await;
            let game = &mut slot.game;
            match game.admin() {
                None => {
                    return Err(AppError::OrphanedAdmin {
                        lobby_code: code.to_string(),
                    })
                }
                Some(admin) if admin != player.id => {
                    return Err(AppError::forbidden(
                        ErrorCode::NotAdmin,
                        "Only the lobby admin can advance the game",
                    ))
                }
                Some(_) => {}
            }

            match plan_advance(game.phase, &game.orchestration)? {
                AdvancePlan::AlreadyStarted => {
                    debug!(lobby = %code, "[COORDINATOR] advance ignored, already starting");
                    return Ok(());
                }
                AdvancePlan::ShowLeaderboard => {
                    game.phase = GamePhase::Leaderboard;
                    info!(lobby = %code, "[COORDINATOR] leaderboard shown");
                    self.broadcast(game, &Outbound::Scores);
                    return Ok(());
                }
                AdvancePlan::StartOrchestration => {
                    game.orchestration = Orchestration::Starting;
                    (
                        game.orchestrator_handle.clone(),
                        game.settings.rounds,
                        game.settings.countdown_seconds,
                    )
                }
            }
        };

        let started = match self
            .gateway
            .start_round_orchestration(&handle, rounds, countdown)
            .await
        {
            Ok(started) => started,
            Err(err) => {
                let mut slot = cell.lock().await;
                if slot.game.orchestration == Orchestration::Starting {
                    slot.game.orchestration = Orchestration::Idle;
                }
                return Err(err.into());
            }
        };

        let stream = self.push.open(&started.subscription_endpoint).await;

        let mut slot = cell.lock().await;
        if slot.game.orchestration != Orchestration::Starting {
            // Game was torn down or reset while the backend was starting it.
            warn!(lobby = %code, "[COORDINATOR] orchestration started for a game that moved on");
            return Ok(());
        }
        slot.game.orchestration = Orchestration::Running {
            orchestrator_id: started.orchestrator_id.clone(),
            subscription_endpoint: started.subscription_endpoint.clone(),
        };
        let sink: Weak<dyn OrchestratorSink> = self.this.clone();
        slot.subscription = Some(OrchestratorSubscription::spawn(
            code.clone(),
            started.subscription_endpoint,
            stream,
            sink,
        ));
        info!(
            lobby = %code,
            orchestrator_id = %started.orchestrator_id,
            "[COORDINATOR] orchestration running"
        );
        self.broadcast(
            &slot.game,
            &Outbound::Notice("The game is starting".to_string()),
        );
        Ok(())
    }

    /// Apply one orchestrator event to a game. Events that do not fit the
    /// game's current phase are rejected with `IllegalTransition` and leave
    /// the game untouched.
    pub async fn apply_orchestrator_event(
        &self,
        code: &LobbyCode,
        event: OrchestratorEvent,
    ) -> Result<(), AppError> {
        // Resolve outside the lock; the lookup is a backend call.
        let resolved = match &event {
            OrchestratorEvent::NewRound { location } => {
                Some(self.resolve_location(location).await?)
            }
            _ => None,
        };

        let cell = self
            .games
            .get(code)
            .ok_or_else(|| AppError::lobby_not_found(code))?;
        let mut slot = cell.lock().await;
        let game = &mut slot.game;
        let next = next_phase(game.phase, game.is_orchestration_running(), event.trigger())?;

        match event {
            OrchestratorEvent::NewRound { .. } => {
                game.phase = next;
                game.location = resolved;
                game.round_no += 1;
                game.last_deltas.clear();
                for id in game.member_ids() {
                    self.players.update(id, |p| p.last_guess = None);
                }
                info!(lobby = %code, round = game.round_no, "[COORDINATOR] new round");
                self.broadcast(game, &Outbound::GuessPrompt);
            }
            OrchestratorEvent::RoundEnd { message } => {
                let message = message.unwrap_or_else(|| DEFAULT_ROUND_END_MESSAGE.to_string());
                self.broadcast(game, &Outbound::RoundEnded(message));
            }
            OrchestratorEvent::LeaderboardUpdate { deltas } => {
                self.apply_deltas(code, game.members(), &deltas);
                game.phase = next;
                game.last_deltas = deltas;
                info!(lobby = %code, round = game.round_no, "[COORDINATOR] round scored");
                self.broadcast(game, &Outbound::Answers);
            }
            OrchestratorEvent::GameOver { message } => {
                game.phase = next;
                game.location = None;
                let subscription = slot.subscription.take();
                let message = message.unwrap_or_else(|| DEFAULT_GAME_OVER_MESSAGE.to_string());
                self.broadcast(&slot.game, &Outbound::Notice(message));
                let handle = slot.game.orchestrator_handle.clone();
                drop(slot);
                drop(subscription);

                info!(lobby = %code, "[COORDINATOR] game over");
                return self.conclude(code, &handle).await;
            }
        }
        Ok(())
    }

    async fn resolve_location(&self, location: &LocationRef) -> Result<RoundLocation, AppError> {
        if let Some(image_url) = &location.image_url {
            return Ok(RoundLocation {
                location_id: location.location_id.clone(),
                image_url: image_url.clone(),
            });
        }
        let record = self.gateway.get_location(&location.location_id).await?;
        Ok(RoundLocation {
            location_id: record.location_id,
            image_url: record.image_url,
        })
    }

    /// Deltas apply as one batch while the game lock is held. Unknown or
    /// offline players are skipped.
    fn apply_deltas(&self, code: &LobbyCode, members: &[Member], deltas: &[ScoreDelta]) {
        for delta in deltas {
            let applied = members
                .iter()
                .find(|m| m.username == delta.player)
                .and_then(|m| self.players.update(m.player_id, |p| p.apply_delta(delta.delta)));
            if applied.is_none() {
                warn!(
                    lobby = %code,
                    player = %delta.player,
                    "[COORDINATOR] score delta for unknown player skipped"
                );
            }
        }
    }

    /// Finalize results and release every member back to the menu.
    ///
    /// The game record is dropped only once the backend has finalized it; a
    /// failed finalize leaves a `Concluded` record behind.
    async fn conclude(&self, code: &LobbyCode, handle: &str) -> Result<(), AppError> {
        let finalized = self.gateway.finalize_results(handle).await;

        let Some(cell) = self.games.get(code) else {
            return finalized.map_err(AppError::from);
        };
        match &finalized {
            Ok(()) => {
                self.games.remove(code);
            }
            Err(err) => {
                error!(
                    lobby = %code,
                    handle = %handle,
                    error = %err,
                    "[COORDINATOR] finalize failed, keeping concluded game"
                );
                self.retry_finalize(code.clone(), handle.to_string());
            }
        }

        let mut slot = cell.lock().await;
        for id in slot.game.member_ids() {
            slot.game.remove_member(id);
            self.games.unbind(id, code);
            self.players.update(id, |p| {
                p.ui_mode = UiMode::Menu;
                p.last_guess = None;
            });
            self.emit_outside(id, &Outbound::Menu);
        }
        drop(slot);

        finalized.map_err(AppError::from)
    }

    /// Retry a failed finalize in the background with linear backoff. The
    /// concluded record is dropped once the backend accepts it.
    fn retry_finalize(&self, code: LobbyCode, handle: String) {
        let this = self.this.clone();
        let delay = self.limits.finalize_retry_delay;
        tokio::spawn(async move {
            for attempt in 1..=FINALIZE_RETRY_ATTEMPTS {
                sleep(delay * attempt).await;
                let Some(coordinator) = this.upgrade() else {
                    return;
                };
                match coordinator.gateway.finalize_results(&handle).await {
                    Ok(()) => {
                        coordinator.drop_concluded(&code, &handle).await;
                        info!(lobby = %code, attempt, "[COORDINATOR] finalize retry succeeded");
                        return;
                    }
                    Err(err) => {
                        warn!(lobby = %code, attempt, error = %err, "[COORDINATOR] finalize retry failed");
                    }
                }
            }
            error!(
                lobby = %code,
                handle = %handle,
                attempts = FINALIZE_RETRY_ATTEMPTS,
                "[COORDINATOR] finalize abandoned, concluded game stays registered"
            );
        });
    }

    async fn drop_concluded(&self, code: &LobbyCode, handle: &str) {
        let Some(cell) = self.games.get(code) else {
            return;
        };
        let slot = cell.lock().await;
        if slot.game.phase == GamePhase::Concluded && slot.game.orchestrator_handle == handle {
            self.games.remove(code);
        }
    }
}

#[async_trait]
impl OrchestratorSink for SessionCoordinator {
    async fn apply_orchestrator_event(
        &self,
        code: &LobbyCode,
        event: OrchestratorEvent,
    ) -> Result<(), AppError> {
        SessionCoordinator::apply_orchestrator_event(self, code, event).await
    }
}

//! Phase rules for orchestrator triggers and admin advances.

use crate::domain::game::{GamePhase, Orchestration};
use crate::errors::domain::DomainError;

/// Events pushed by the backend orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseTrigger {
    NewRound,
    RoundEnd,
    LeaderboardUpdate,
    GameOver,
}

impl PhaseTrigger {
    pub const fn as_str(self) -> &'static str {
        match self {
            PhaseTrigger::NewRound => "newRound",
            PhaseTrigger::RoundEnd => "roundEnd",
            PhaseTrigger::LeaderboardUpdate => "leaderboardUpdate",
            PhaseTrigger::GameOver => "gameOver",
        }
    }
}

/// Phase a game moves to when `trigger` arrives.
///
/// `roundEnd` keeps the phase (`Guessing`) and only produces a notice.
/// A first `newRound` from `Waiting` needs orchestration to be running.
pub fn next_phase(
    phase: GamePhase,
    orchestration_running: bool,
    trigger: PhaseTrigger,
) -> Result<GamePhase, DomainError> {
    use GamePhase::*;
    use PhaseTrigger::*;

    match (phase, trigger) {
        (Concluded, _) => Err(DomainError::IllegalTransition { phase, trigger }),
        (_, GameOver) => Ok(Concluded),
        (Waiting, NewRound) if orchestration_running => Ok(Guessing),
        (Results, NewRound) => Ok(Guessing),
        (Guessing, RoundEnd) => Ok(Guessing),
        (Guessing, LeaderboardUpdate) => Ok(Results),
        _ => Err(DomainError::IllegalTransition { phase, trigger }),
    }
}

/// What an admin `advance` does in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvancePlan {
    /// Ask the backend to start round orchestration.
    StartOrchestration,
    /// Start already requested or running; nothing to do.
    AlreadyStarted,
    /// Show the standings; purely local.
    ShowLeaderboard,
}

pub fn plan_advance(
    phase: GamePhase,
    orchestration: &Orchestration,
) -> Result<AdvancePlan, DomainError> {
    match (phase, orchestration) {
        (GamePhase::Waiting, Orchestration::Idle) => Ok(AdvancePlan::StartOrchestration),
        (GamePhase::Waiting, _) => Ok(AdvancePlan::AlreadyStarted),
        (GamePhase::Results, _) => Ok(AdvancePlan::ShowLeaderboard),
        (phase, _) => Err(DomainError::AdvanceNotAllowed { phase }),
    }
}

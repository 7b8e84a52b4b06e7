//! Domain-level error type for pure game and registry logic.
//!
//! Transport-agnostic. Coordinator code converts it into
//! `crate::error::AppError` through the provided `From` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::domain::game::GamePhase;
use crate::domain::transition::PhaseTrigger;

/// Which input failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    Username,
    Password,
    Upload,
    Other,
}

/// Semantic conflicts with existing registry state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    DuplicateLogin,
    ConnectionBound,
    AlreadyMember,
    AlreadyInGame,
    LobbyCodeInUse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input rejected before reaching the backend
    Validation(ValidationKind, String),
    /// Registry invariant would be broken
    Conflict(ConflictKind, String),
    /// Orchestrator trigger that does not fit the current phase
    IllegalTransition {
        phase: GamePhase,
        trigger: PhaseTrigger,
    },
    /// Admin advance in a phase with no advance semantics
    AdvanceNotAllowed { phase: GamePhase },
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(kind, d) => write!(f, "validation error {kind:?}: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::IllegalTransition { phase, trigger } => {
                write!(f, "{} is not legal in phase {}", trigger.as_str(), phase.as_str())
            }
            DomainError::AdvanceNotAllowed { phase } => {
                write!(f, "cannot advance a game in phase {}", phase.as_str())
            }
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }

    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
}

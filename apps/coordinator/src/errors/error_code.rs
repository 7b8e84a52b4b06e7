//! Error codes surfaced to clients.
//!
//! Every failure the coordinator reports, over the realtime channel or as an
//! HTTP problem body, carries one of these codes. Add new codes here; never
//! pass ad-hoc strings as error codes.

use core::fmt;

/// Canonical SCREAMING_SNAKE_CASE failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request validation
    /// General validation error
    ValidationError,
    /// Username outside the accepted length range
    InvalidUsername,
    /// Password outside the accepted length range
    InvalidPassword,
    /// Upload payload missing, undecodable or too large
    InvalidUpload,
    /// General bad request error
    BadRequest,

    // Session state
    /// Connection already carries a logged-in player
    AlreadyLoggedIn,
    /// Username already has a live session
    DuplicateLogin,
    /// Intent requires a logged-in player
    NotLoggedIn,
    /// Intent requires membership in a game
    NotInGame,
    /// Player is already a member of another game
    AlreadyInGame,
    /// Intent is not valid in the player's current mode
    WrongMode,

    // Game control
    /// Only the admin may advance the game
    NotAdmin,
    /// Advance is not meaningful in the current phase
    AdvanceNotAllowed,
    /// Orchestrator event does not fit the current phase
    IllegalTransition,
    /// Game lost its admin and cannot be advanced
    OrphanedAdmin,

    // Resources
    /// No game with this lobby code
    LobbyNotFound,
    /// Game has concluded and no longer accepts players
    LobbyConcluded,
    /// Backend issued a code that is already registered
    LobbyCodeInUse,
    /// Game already has its maximum number of players
    LobbyFull,

    // Backend gateway
    /// Backend could not be reached
    BackendUnreachable,
    /// Backend answered with something that is not a valid reply
    BackendProtocol,
    /// Backend answered with a business failure
    BackendRejected,

    // System
    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical string representation of this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUsername => "INVALID_USERNAME",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidUpload => "INVALID_UPLOAD",
            Self::BadRequest => "BAD_REQUEST",
            Self::AlreadyLoggedIn => "ALREADY_LOGGED_IN",
            Self::DuplicateLogin => "DUPLICATE_LOGIN",
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::NotInGame => "NOT_IN_GAME",
            Self::AlreadyInGame => "ALREADY_IN_GAME",
            Self::WrongMode => "WRONG_MODE",
            Self::NotAdmin => "NOT_ADMIN",
            Self::AdvanceNotAllowed => "ADVANCE_NOT_ALLOWED",
            Self::IllegalTransition => "ILLEGAL_TRANSITION",
            Self::OrphanedAdmin => "ORPHANED_ADMIN",
            Self::LobbyNotFound => "LOBBY_NOT_FOUND",
            Self::LobbyConcluded => "LOBBY_CONCLUDED",
            Self::LobbyCodeInUse => "LOBBY_CODE_IN_USE",
            Self::LobbyFull => "LOBBY_FULL",
            Self::BackendUnreachable => "BACKEND_UNREACHABLE",
            Self::BackendProtocol => "BACKEND_PROTOCOL",
            Self::BackendRejected => "BACKEND_REJECTED",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

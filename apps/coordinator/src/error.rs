use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;

use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::errors::ErrorCode;
use crate::gateway::GatewayError;
use crate::trace_ctx;

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub trace_id: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Bad request: {detail}")]
    BadRequest { code: ErrorCode, detail: String },
    #[error("Username {username} is already logged in")]
    DuplicateLogin { username: String },
    #[error("Forbidden: {detail}")]
    Forbidden { code: ErrorCode, detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Backend unreachable: {detail}")]
    BackendUnreachable { detail: String },
    #[error("Backend sent an invalid reply: {detail}")]
    BackendProtocol { detail: String },
    #[error("Backend rejected request: {message}")]
    BackendRejected { message: String },
    #[error("Illegal transition: {detail}")]
    IllegalTransition { detail: String },
    #[error("Game {lobby_code} has no admin")]
    OrphanedAdmin { lobby_code: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::BadRequest { code, .. } => *code,
            AppError::DuplicateLogin { .. } => ErrorCode::DuplicateLogin,
            AppError::Forbidden { code, .. } => *code,
            AppError::NotFound { code, .. } => *code,
            AppError::Conflict { code, .. } => *code,
            AppError::BackendUnreachable { .. } => ErrorCode::BackendUnreachable,
            AppError::BackendProtocol { .. } => ErrorCode::BackendProtocol,
            AppError::BackendRejected { .. } => ErrorCode::BackendRejected,
            AppError::IllegalTransition { .. } => ErrorCode::IllegalTransition,
            AppError::OrphanedAdmin { .. } => ErrorCode::OrphanedAdmin,
            AppError::Internal { .. } => ErrorCode::Internal,
            AppError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Validation { detail, .. } => detail.clone(),
            AppError::BadRequest { detail, .. } => detail.clone(),
            AppError::DuplicateLogin { username } => {
                format!("User {username} is already logged in")
            }
            AppError::Forbidden { detail, .. } => detail.clone(),
            AppError::NotFound { detail, .. } => detail.clone(),
            AppError::Conflict { detail, .. } => detail.clone(),
            AppError::BackendUnreachable { detail } => detail.clone(),
            AppError::BackendProtocol { detail } => detail.clone(),
            AppError::BackendRejected { message } => message.clone(),
            AppError::IllegalTransition { detail } => detail.clone(),
            AppError::OrphanedAdmin { lobby_code } => {
                format!("Game {lobby_code} has no admin and cannot be advanced")
            }
            AppError::Internal { detail } => detail.clone(),
            AppError::Config { detail } => detail.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateLogin { .. } => StatusCode::CONFLICT,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::BackendUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BackendProtocol { .. } => StatusCode::BAD_GATEWAY,
            AppError::BackendRejected { .. } => StatusCode::BAD_GATEWAY,
            AppError::IllegalTransition { .. } => StatusCode::CONFLICT,
            AppError::OrphanedAdmin { .. } => StatusCode::CONFLICT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to players in a `failure` event.
    ///
    /// Backend rejections pass the backend's own message through; internal
    /// failures are reduced to a generic sentence.
    pub fn client_message(&self) -> String {
        match self {
            AppError::BackendUnreachable { .. } => {
                "The game service is unavailable, please try again".to_string()
            }
            AppError::BackendProtocol { .. } => {
                "The game service sent an unexpected response, please try again".to_string()
            }
            AppError::Internal { .. } | AppError::Config { .. } => {
                "Something went wrong, please try again".to_string()
            }
            other => other.detail(),
        }
    }

    /// True for failures caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error() || matches!(self, AppError::BackendRejected { .. })
    }

    pub fn invalid(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub fn bad_request(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            detail: detail.into(),
        }
    }

    pub fn forbidden(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn not_logged_in() -> Self {
        Self::bad_request(ErrorCode::NotLoggedIn, "You need to log in first")
    }

    pub fn not_in_game() -> Self {
        Self::bad_request(ErrorCode::NotInGame, "You are not in a game")
    }

    pub fn lobby_not_found(code: impl std::fmt::Display) -> Self {
        Self::not_found(ErrorCode::LobbyNotFound, format!("Lobby {code} does not exist"))
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let lower = word.to_ascii_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(kind, detail) => {
                let code = match kind {
                    ValidationKind::Username => ErrorCode::InvalidUsername,
                    ValidationKind::Password => ErrorCode::InvalidPassword,
                    ValidationKind::Upload => ErrorCode::InvalidUpload,
                    ValidationKind::Other => ErrorCode::ValidationError,
                };
                AppError::invalid(code, detail)
            }
            DomainError::Conflict(kind, detail) => match kind {
                ConflictKind::DuplicateLogin => AppError::conflict(ErrorCode::DuplicateLogin, detail),
                ConflictKind::ConnectionBound => {
                    AppError::conflict(ErrorCode::AlreadyLoggedIn, detail)
                }
                ConflictKind::AlreadyMember | ConflictKind::AlreadyInGame => {
                    AppError::conflict(ErrorCode::AlreadyInGame, detail)
                }
                ConflictKind::LobbyCodeInUse => {
                    AppError::conflict(ErrorCode::LobbyCodeInUse, detail)
                }
            },
            err @ DomainError::IllegalTransition { .. } => AppError::IllegalTransition {
                detail: err.to_string(),
            },
            err @ DomainError::AdvanceNotAllowed { .. } => {
                AppError::bad_request(ErrorCode::AdvanceNotAllowed, err.to_string())
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { message, .. } => AppError::BackendRejected { message },
            err @ GatewayError::Unreachable { .. } => AppError::BackendUnreachable {
                detail: err.to_string(),
            },
            err @ GatewayError::Protocol { .. } => AppError::BackendProtocol {
                detail: err.to_string(),
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code().as_str();
        let trace_id = trace_ctx::trace_id();

        let problem_details = ProblemDetails {
            type_: format!(
                "https://guessr.game/errors/{}",
                code.to_ascii_lowercase().replace('_', "-")
            ),
            title: Self::humanize_code(code),
            status: status.as_u16(),
            detail: self.detail(),
            code: code.to_string(),
            trace_id: trace_id.clone(),
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .insert_header(("x-trace-id", trace_id))
            .json(problem_details)
    }
}

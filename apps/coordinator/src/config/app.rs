//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::telemetry::LogFormat;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BACKEND_ENDPOINT: &str = "http://localhost:8181";
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;
const DEFAULT_BACKEND_MAX_ATTEMPTS: u32 = 3;
const MAX_BACKEND_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_LEADERBOARD_MAX_LIMIT: u32 = 100;
const DEFAULT_FINALIZE_RETRY_DELAY_MS: u64 = 2000;

/// How to reach the game backend.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    /// Sent as `x-functions-key` when set.
    pub function_key: Option<String>,
    pub timeout: Duration,
    /// Total tries for a request whose connection could not be opened.
    pub max_attempts: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_BACKEND_ENDPOINT.to_string(),
            function_key: None,
            timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            max_attempts: DEFAULT_BACKEND_MAX_ATTEMPTS,
        }
    }
}

/// Limits applied by the session coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_upload_bytes: usize,
    pub leaderboard_max_limit: u32,
    /// Base delay between background retries of a failed finalize.
    pub finalize_retry_delay: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            leaderboard_max_limit: DEFAULT_LEADERBOARD_MAX_LIMIT,
            finalize_retry_delay: Duration::from_millis(DEFAULT_FINALIZE_RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    pub gateway: GatewayConfig,

    /// Redis for orchestrator push channels. In-process channels when unset.
    pub redis_url: Option<String>,

    pub limits: SessionLimits,

    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty("COORDINATOR_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match non_empty("COORDINATOR_PORT").or_else(|| non_empty("PORT")) {
            Some(raw) => parse_number::<u16>("COORDINATOR_PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let endpoint =
            non_empty("BACKEND_ENDPOINT").unwrap_or_else(|| DEFAULT_BACKEND_ENDPOINT.to_string());
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::config(format!(
                "BACKEND_ENDPOINT must be an http(s) URL, got '{endpoint}'"
            )));
        }
        let timeout_ms = match non_empty("BACKEND_TIMEOUT_MS") {
            Some(raw) => parse_number::<u64>("BACKEND_TIMEOUT_MS", &raw)?,
            None => DEFAULT_BACKEND_TIMEOUT_MS,
        };
        let max_attempts = match non_empty("BACKEND_MAX_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("BACKEND_MAX_ATTEMPTS", &raw)?,
            None => DEFAULT_BACKEND_MAX_ATTEMPTS,
        };
        if !(1..=MAX_BACKEND_MAX_ATTEMPTS).contains(&max_attempts) {
            return Err(AppError::config(format!(
                "BACKEND_MAX_ATTEMPTS must be between 1 and {MAX_BACKEND_MAX_ATTEMPTS}, got {max_attempts}"
            )));
        }

        let max_upload_bytes = match non_empty("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number::<usize>("MAX_UPLOAD_BYTES", &raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };
        let leaderboard_max_limit = match non_empty("LEADERBOARD_MAX_LIMIT") {
            Some(raw) => parse_number::<u32>("LEADERBOARD_MAX_LIMIT", &raw)?.max(1),
            None => DEFAULT_LEADERBOARD_MAX_LIMIT,
        };
        let finalize_retry_delay_ms = match non_empty("FINALIZE_RETRY_DELAY_MS") {
            Some(raw) => parse_number::<u64>("FINALIZE_RETRY_DELAY_MS", &raw)?,
            None => DEFAULT_FINALIZE_RETRY_DELAY_MS,
        };

        let log_format = match non_empty("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Config {
            host,
            port,
            gateway: GatewayConfig {
                endpoint,
                function_key: non_empty("BACKEND_FUNCTION_KEY"),
                timeout: Duration::from_millis(timeout_ms),
                max_attempts,
            },
            redis_url: non_empty("REDIS_URL"),
            limits: SessionLimits {
                max_upload_bytes,
                leaderboard_max_limit,
                finalize_retry_delay: Duration::from_millis(finalize_retry_delay_ms),
            },
            log_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::config(format!("{key} must be a number, got '{raw}'")))
}

//! Orchestrator push messages.
//!
//! The orchestrator publishes `{"target": <event>, "arguments": [...]}`.
//! Positional arguments per target:
//!
//! * `newRound`: `[imageUrl, locationId]`, or a single
//!   `{"locationId", "imageUrl"?}` object
//! * `roundEnd` / `roundEnded`: `[message?]`
//! * `leaderboardUpdate` / `updateLeaderboard`: `[[{"player", "delta"}, ...]]`
//! * `gameOver`: `[message?]`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::game::ScoreDelta;
use crate::domain::transition::PhaseTrigger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub target: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl PushEnvelope {
    pub fn new(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRef {
    pub location_id: String,
    /// Missing when the orchestrator only sends an id.
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    NewRound { location: LocationRef },
    RoundEnd { message: Option<String> },
    LeaderboardUpdate { deltas: Vec<ScoreDelta> },
    GameOver { message: Option<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("unknown push target '{0}'")]
    UnknownTarget(String),
    #[error("bad arguments for {target}: {detail}")]
    BadArguments {
        target: &'static str,
        detail: String,
    },
}

impl OrchestratorEvent {
    pub fn trigger(&self) -> PhaseTrigger {
        match self {
            OrchestratorEvent::NewRound { .. } => PhaseTrigger::NewRound,
            OrchestratorEvent::RoundEnd { .. } => PhaseTrigger::RoundEnd,
            OrchestratorEvent::LeaderboardUpdate { .. } => PhaseTrigger::LeaderboardUpdate,
            OrchestratorEvent::GameOver { .. } => PhaseTrigger::GameOver,
        }
    }

    pub fn decode(envelope: &PushEnvelope) -> Result<Self, EnvelopeError> {
        let args = &envelope.arguments;
        match envelope.target.as_str() {
            "newRound" => decode_new_round(args),
            "roundEnd" | "roundEnded" => Ok(OrchestratorEvent::RoundEnd {
                message: optional_text(args, "roundEnd")?,
            }),
            "leaderboardUpdate" | "updateLeaderboard" => {
                let raw = args.first().cloned().unwrap_or(Value::Array(Vec::new()));
                let deltas = serde_json::from_value(raw).map_err(|err| {
                    EnvelopeError::BadArguments {
                        target: "leaderboardUpdate",
                        detail: err.to_string(),
                    }
                })?;
                Ok(OrchestratorEvent::LeaderboardUpdate { deltas })
            }
            "gameOver" => Ok(OrchestratorEvent::GameOver {
                message: optional_text(args, "gameOver")?,
            }),
            other => Err(EnvelopeError::UnknownTarget(other.to_string())),
        }
    }
}

fn decode_new_round(args: &[Value]) -> Result<OrchestratorEvent, EnvelopeError> {
    let bad = |detail: &str| EnvelopeError::BadArguments {
        target: "newRound",
        detail: detail.to_string(),
    };

    let location = match args {
        [Value::Object(obj)] => {
            let location_id = obj
                .get("locationId")
                .and_then(id_text)
                .ok_or_else(|| bad("missing locationId"))?;
            let image_url = obj
                .get("imageUrl")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            LocationRef {
                location_id,
                image_url,
            }
        }
        [image, id, ..] => LocationRef {
            location_id: id_text(id).ok_or_else(|| bad("missing location id"))?,
            image_url: image
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        },
        [id] => LocationRef {
            location_id: id_text(id).ok_or_else(|| bad("missing location id"))?,
            image_url: None,
        },
        [] => return Err(bad("no arguments")),
    };

    Ok(OrchestratorEvent::NewRound { location })
}

/// Location ids arrive as strings or numbers.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(args: &[Value], target: &'static str) -> Result<Option<String>, EnvelopeError> {
    match args.first() {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EnvelopeError::BadArguments {
            target,
            detail: format!("expected a message string, got {other}"),
        }),
    }
}

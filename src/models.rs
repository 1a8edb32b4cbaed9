// src/models.rs
use serde::{Deserialize, Serialize};

use crate::error::{NotifierError, Result};
use crate::outbound::DeliveryReceipt;

/// Longest accepted player name, in characters, after trimming
pub const MAX_PLAYER_NAME_LEN: usize = 64;

/// Longest accepted `startedAt` display string
pub const MAX_STARTED_AT_LEN: usize = 64;

/// `service` value that marks a looking-for-game status update
pub const QUEUE_STATUS_SERVICE: &str = "queuestatus";

/// Anything the game engine posts to the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    MatchStart(MatchStartEvent),
    QueueStatus(QueueStatusEvent),
}

impl WebhookEvent {
    /// Parse a webhook body, routing on its optional `service` field
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| NotifierError::validation(format!("invalid JSON: {}", e)))?;

        let service = value
            .get("service")
            .and_then(|s| s.as_str())
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        if service == QUEUE_STATUS_SERVICE {
            return Ok(WebhookEvent::QueueStatus(QueueStatusEvent::from_value(&value)));
        }
        MatchStartEvent::from_value(value).map(WebhookEvent::MatchStart)
    }
}

/// Match-start event posted by the game engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStartEvent {
    #[serde(default)]
    pub player_one: String,
    #[serde(default)]
    pub player_two: String,
    /// Display-only; never parsed as a date
    #[serde(default)]
    pub started_at: String,
}

impl MatchStartEvent {
    /// Validate a decoded body. All three fields must be non-blank and bounded.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let mut event: MatchStartEvent = serde_json::from_value(value)
            .map_err(|e| NotifierError::validation(format!("invalid match event: {}", e)))?;

        event.player_one = event.player_one.trim().to_string();
        event.player_two = event.player_two.trim().to_string();
        event.started_at = event.started_at.trim().to_string();

        let fields = [
            ("playerOne", &event.player_one, MAX_PLAYER_NAME_LEN),
            ("playerTwo", &event.player_two, MAX_PLAYER_NAME_LEN),
            ("startedAt", &event.started_at, MAX_STARTED_AT_LEN),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value, _)| value.is_empty())
            .map(|(name, _, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(NotifierError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if let Some((name, _, limit)) = fields
            .iter()
            .find(|(_, value, limit)| value.chars().count() > *limit)
        {
            return Err(NotifierError::validation(format!(
                "{} exceeds {} characters",
                name, limit
            )));
        }

        Ok(event)
    }
}

/// Looking-for-game status from the matchmaking queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatusEvent {
    pub is_looking: bool,
}

impl QueueStatusEvent {
    /// `isLooking` may arrive as a bool, a number or a string; anything else is `false`
    fn from_value(value: &serde_json::Value) -> Self {
        let is_looking = match value.get("isLooking") {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n as i64 != 0),
            Some(serde_json::Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y")
            }
            _ => false,
        };
        Self { is_looking }
    }
}

/// How many of the two players could be resolved to a Discord account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    FullMatch,
    PartialMatch,
    NoMatch,
}

impl MatchOutcome {
    pub fn classify(first_resolved: bool, second_resolved: bool) -> Self {
        match (first_resolved, second_resolved) {
            (true, true) => MatchOutcome::FullMatch,
            (false, false) => MatchOutcome::NoMatch,
            _ => MatchOutcome::PartialMatch,
        }
    }
}

/// Response body for a processed match event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    pub ok: bool,
    pub outcome: MatchOutcome,
    pub mentioned: Vec<String>,
    pub delivery: DeliveryReceipt,
}

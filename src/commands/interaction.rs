//! Discord interaction payloads, in and out
//!
//! Only the pieces of the interaction object this service reads are modeled.
//! Incoming JSON is mapped onto a closed [`Interaction`] enum so every kind is
//! handled explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{NotifierError, Result};

/// Interaction type codes (request side)
const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

/// Interaction callback type codes (response side)
const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Message flag: only the invoking user sees the reply
pub const EPHEMERAL: u64 = 1 << 6;

/// An authenticated interaction request
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Discord's endpoint health check
    Ping,
    /// A slash command invocation
    ApplicationCommand(CommandInvocation),
    /// Any other interaction kind (components, autocomplete, modals, ...)
    Unsupported { kind: u8 },
}

/// A slash command invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub name: String,
    pub options: HashMap<String, serde_json::Value>,
    /// Taken from the interaction's member/user object, never from options
    pub invoking_user_id: String,
}

impl CommandInvocation {
    /// String value of an option, if present and a string
    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(|v| v.as_str())
    }
}

#[derive(Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<RawCommandData>,
    /// Present for guild invocations
    #[serde(default)]
    member: Option<RawMember>,
    /// Present for DM invocations
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawCommandData {
    name: String,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Deserialize)]
struct RawOption {
    name: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawMember {
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
}

impl Interaction {
    /// Parse an interaction body. Call only after the signature was verified.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawInteraction = serde_json::from_slice(body)
            .map_err(|e| NotifierError::validation(format!("invalid interaction JSON: {}", e)))?;

        match raw.kind {
            PING => Ok(Interaction::Ping),
            APPLICATION_COMMAND => {
                let data = raw
                    .data
                    .ok_or_else(|| NotifierError::validation("command interaction without data"))?;

                let invoking_user_id = raw
                    .member
                    .and_then(|m| m.user)
                    .or(raw.user)
                    .map(|u| u.id)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| NotifierError::validation("command interaction without a user"))?;

                let options = data
                    .options
                    .into_iter()
                    .filter_map(|o| o.value.map(|v| (o.name, v)))
                    .collect();

                Ok(Interaction::ApplicationCommand(CommandInvocation {
                    name: data.name,
                    options,
                    invoking_user_id,
                }))
            }
            kind => Ok(Interaction::Unsupported { kind }),
        }
    }
}

/// Reply to an interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMessage {
    pub content: String,
    pub flags: u64,
    pub allowed_mentions: AllowedMentions,
}

/// Allowed mentions for a message; an empty `parse` list pings nobody by accident
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

impl AllowedMentions {
    pub fn users(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            parse: Vec::new(),
            users: ids.into_iter().collect(),
        }
    }
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// A reply only the invoking user can see
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseMessage {
                content: content.into(),
                flags: EPHEMERAL,
                allowed_mentions: AllowedMentions::default(),
            }),
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.content.as_str())
    }
}

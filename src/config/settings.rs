use ed25519_dalek::VerifyingKey;
use std::time::Duration;

use crate::error::{NotifierError, Result};
use crate::managers::lfg_banner::DEFAULT_LFG_MESSAGE;
use crate::verification::parse_public_key;

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 6;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 12;

/// Where player links (and reusable thread ids) are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; links are lost on restart
    Memory,
    /// Upstash-style Redis REST endpoint
    Upstash { url: String, token: String },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Upstash { .. } => "upstash",
        }
    }
}

/// How match notifications reach Discord
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Incoming webhook URL, plain channel post only
    Webhook { url: String },
    /// Bot token posting into a channel
    Channel { bot_token: String, channel_id: u64 },
    /// Bot token creating one private thread per player pair under a channel
    Thread { bot_token: String, channel_id: u64 },
}

impl DeliveryMode {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryMode::Webhook { .. } => "webhook",
            DeliveryMode::Channel { .. } => "channel",
            DeliveryMode::Thread { .. } => "thread",
        }
    }

    pub fn uses_threads(&self) -> bool {
        matches!(self, DeliveryMode::Thread { .. })
    }
}

/// Looking-for-game banner channel (bot delivery modes only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfgSettings {
    pub channel_id: u64,
    pub message_text: String,
}

/// Runtime settings for the notifier, read from the environment
#[derive(Clone)]
pub struct Settings {
    pub shared_secret: String,
    pub public_key: VerifyingKey,
    pub store: StoreBackend,
    pub delivery: DeliveryMode,
    pub lfg: Option<LfgSettings>,
    pub store_timeout: Duration,
    pub delivery_timeout: Duration,
}

impl Settings {
    /// Create settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Deployment dashboards like to wrap values in quotes.
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &str| {
            get(name).ok_or_else(|| NotifierError::ConfigMissing {
                name: name.to_string(),
            })
        };

        let shared_secret = require("SHARED_SECRET")?;
        let public_key = parse_public_key(&require("DISCORD_PUBLIC_KEY")?)?;

        let store = match get("STORE_BACKEND").map(|s| s.to_lowercase()) {
            Some(ref s) if s == "memory" => StoreBackend::Memory,
            Some(ref s) if s == "upstash" => StoreBackend::Upstash {
                url: require("UPSTASH_REDIS_REST_URL")?,
                token: require("UPSTASH_REDIS_REST_TOKEN")?,
            },
            Some(other) => {
                return Err(NotifierError::ConfigValidation {
                    message: format!("STORE_BACKEND must be 'memory' or 'upstash', got '{}'", other),
                })
            }
            None => match (get("UPSTASH_REDIS_REST_URL"), get("UPSTASH_REDIS_REST_TOKEN")) {
                (Some(url), Some(token)) => StoreBackend::Upstash { url, token },
                _ => StoreBackend::Memory,
            },
        };

        let snowflake = |name: &str, raw: String| -> Result<u64> {
            raw.parse::<u64>()
                .ok()
                .filter(|id| *id != 0)
                .ok_or_else(|| NotifierError::ConfigValidation {
                    message: format!("{} must be a numeric snowflake", name),
                })
        };

        let bot_target = || -> Result<(String, u64)> {
            let bot_token = get("DISCORD_BOT_TOKEN")
                .or_else(|| get("DISCORD_TOKEN"))
                .ok_or_else(|| NotifierError::ConfigMissing {
                    name: "DISCORD_BOT_TOKEN".to_string(),
                })?;
            let channel_id = snowflake("DISCORD_CHANNEL_ID", require("DISCORD_CHANNEL_ID")?)?;
            Ok((bot_token, channel_id))
        };

        let delivery = match get("DELIVERY_MODE").map(|s| s.to_lowercase()) {
            Some(ref s) if s == "webhook" => DeliveryMode::Webhook {
                url: require("DISCORD_WEBHOOK_URL")?,
            },
            Some(ref s) if s == "channel" => {
                let (bot_token, channel_id) = bot_target()?;
                DeliveryMode::Channel { bot_token, channel_id }
            }
            Some(ref s) if s == "thread" => {
                let (bot_token, channel_id) = bot_target()?;
                DeliveryMode::Thread { bot_token, channel_id }
            }
            Some(other) => {
                return Err(NotifierError::ConfigValidation {
                    message: format!(
                        "DELIVERY_MODE must be 'webhook', 'channel' or 'thread', got '{}'",
                        other
                    ),
                })
            }
            None => match get("DISCORD_WEBHOOK_URL") {
                Some(url) => DeliveryMode::Webhook { url },
                None => {
                    let (bot_token, channel_id) = bot_target()?;
                    DeliveryMode::Channel { bot_token, channel_id }
                }
            },
        };

        let seconds = |name: &str, default: u64| -> Result<Duration> {
            match get(name) {
                Some(raw) => match raw.parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                    _ => Err(NotifierError::ConfigValidation {
                        message: format!("{} must be a positive number of seconds", name),
                    }),
                },
                None => Ok(Duration::from_secs(default)),
            }
        };

        let lfg = match get("DISCORD_LFG_CHANNEL_ID") {
            Some(raw) => Some(LfgSettings {
                channel_id: snowflake("DISCORD_LFG_CHANNEL_ID", raw)?,
                message_text: get("LFG_MESSAGE_TEXT")
                    .unwrap_or_else(|| DEFAULT_LFG_MESSAGE.to_string()),
            }),
            None => None,
        };

        Ok(Self {
            shared_secret,
            public_key,
            store,
            delivery,
            lfg,
            store_timeout: seconds("STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?,
            delivery_timeout: seconds("DELIVERY_TIMEOUT_SECS", DEFAULT_DELIVERY_TIMEOUT_SECS)?,
        })
    }
}

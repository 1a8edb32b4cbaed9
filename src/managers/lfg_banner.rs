//! Single "looking for game" banner kept in a channel while someone queues

use serde::Serialize;
use serenity::all::{ChannelId, MessageId};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{bounded, Result};
use crate::outbound::discord::parse_snowflake;
use crate::outbound::{Removal, SharedDiscordApi};
use crate::state::SharedKeyValueStore;

/// Key prefix for the tracked banner message id, per channel
pub const LFG_MESSAGE_PREFIX: &str = "lfgmsg:";

pub const DEFAULT_LFG_MESSAGE: &str = "Someone is looking for game!";

/// Pages of recent history searched for stray banners when clearing
const MAX_SCAN_PAGES: usize = 5;

/// What a queue-status update did to the banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LfgReport {
    Exists { message_id: String },
    Created { message_id: String },
    DeletedAll { deleted: usize },
}

#[derive(Clone)]
pub struct LfgBanner {
    api: SharedDiscordApi,
    kv: SharedKeyValueStore,
    channel_id: ChannelId,
    text: String,
    store_timeout: Duration,
    delivery_timeout: Duration,
}

impl LfgBanner {
    pub fn new(
        api: SharedDiscordApi,
        kv: SharedKeyValueStore,
        channel_id: u64,
        text: String,
        store_timeout: Duration,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            api,
            kv,
            channel_id: ChannelId::new(channel_id),
            text,
            store_timeout,
            delivery_timeout,
        }
    }

    fn key(&self) -> String {
        format!("{}{}", LFG_MESSAGE_PREFIX, self.channel_id)
    }

    /// Show the banner while someone is queueing, remove it otherwise
    pub async fn update(&self, is_looking: bool) -> Result<LfgReport> {
        if is_looking {
            bounded("lfg banner post", self.delivery_timeout, self.raise()).await
        } else {
            bounded("lfg banner clear", self.delivery_timeout, self.clear()).await
        }
    }

    async fn tracked_message(&self) -> Result<Option<MessageId>> {
        let raw = bounded("lfg banner lookup", self.store_timeout, self.kv.get(&self.key())).await?;
        Ok(raw.as_deref().and_then(parse_snowflake).map(MessageId::new))
    }

    async fn raise(&self) -> Result<LfgReport> {
        if let Some(message_id) = self.tracked_message().await? {
            info!("LFG banner already up in {}: {}", self.channel_id, message_id);
            return Ok(LfgReport::Exists {
                message_id: message_id.to_string(),
            });
        }

        let message_id = self
            .api
            .post_message(self.channel_id, &self.text, &BTreeSet::new())
            .await?;
        let value = message_id.to_string();
        if let Err(e) = bounded("lfg banner save", self.store_timeout, self.kv.set(&self.key(), &value)).await {
            warn!("Could not remember LFG banner {}: {}", message_id, e);
        }
        info!("LFG banner posted in {}: {}", self.channel_id, message_id);

        Ok(LfgReport::Created { message_id: value })
    }

    /// Delete the tracked banner and any copy of it in recent history
    async fn clear(&self) -> Result<LfgReport> {
        let mut deleted = 0;

        if let Some(message_id) = self.tracked_message().await? {
            match self.api.delete_message(self.channel_id, message_id).await {
                Ok(Removal::Deleted) => deleted += 1,
                Ok(Removal::AlreadyGone) => {}
                Err(e) => warn!("Failed to delete tracked LFG banner {}: {}", message_id, e),
            }
        }

        let mut before = None;
        for _ in 0..MAX_SCAN_PAGES {
            let page = self.api.recent_messages(self.channel_id, before).await?;
            let Some(last) = page.last() else {
                break;
            };
            before = Some(last.id);

            for message in page.iter().filter(|m| m.content == self.text) {
                match self.api.delete_message(self.channel_id, message.id).await {
                    Ok(_) => deleted += 1,
                    Err(e) => warn!("Failed to delete LFG banner {}: {}", message.id, e),
                }
            }
        }

        if let Err(e) = bounded("lfg banner forget", self.store_timeout, self.kv.delete(&self.key())).await {
            warn!("Could not forget LFG banner for {}: {}", self.channel_id, e);
        }
        info!("LFG banners removed from {}: {}", self.channel_id, deleted);

        Ok(LfgReport::DeletedAll { deleted })
    }
}

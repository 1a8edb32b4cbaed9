//! Bot-token delivery: channel posts and per-pair private threads

use async_trait::async_trait;
use serenity::all::{ChannelId, UserId};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

use super::discord::{parse_snowflake, SharedDiscordApi};
use super::{DeliveryReceipt, DeliveryTarget, Notification, OutboundChannel};
use crate::error::{bounded, Result};
use crate::state::SharedKeyValueStore;

/// Remembers which thread belongs to which player pair
#[derive(Clone)]
pub struct ThreadReuse {
    kv: SharedKeyValueStore,
    timeout: Duration,
}

impl ThreadReuse {
    pub fn new(kv: SharedKeyValueStore, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    async fn lookup(&self, key: &str) -> Option<ChannelId> {
        match bounded("thread lookup", self.timeout, self.kv.get(key)).await {
            Ok(value) => value.as_deref().and_then(parse_snowflake).map(ChannelId::new),
            Err(e) => {
                warn!("Could not look up thread for '{}': {}", key, e);
                None
            }
        }
    }

    async fn remember(&self, key: &str, thread_id: ChannelId) {
        let value = thread_id.to_string();
        if let Err(e) = bounded("thread save", self.timeout, self.kv.set(key, &value)).await {
            warn!("Could not remember thread {} for '{}': {}", thread_id, key, e);
        }
    }
}

/// Delivers through the Discord REST API with a bot token
pub struct BotChannel {
    api: SharedDiscordApi,
    channel_id: ChannelId,
    reuse: Option<ThreadReuse>,
}

impl BotChannel {
    pub fn new(api: SharedDiscordApi, channel_id: u64, reuse: Option<ThreadReuse>) -> Self {
        Self {
            api,
            channel_id: ChannelId::new(channel_id),
            reuse,
        }
    }

    async fn add_members(&self, thread_id: ChannelId, members: &BTreeSet<String>) {
        for member in members {
            let Some(user_id) = parse_snowflake(member).map(UserId::new) else {
                warn!("Skipping non-numeric member id '{}'", member);
                continue;
            };
            match self.api.add_thread_member(thread_id, user_id).await {
                Ok(()) => info!("Added {} to thread {}", user_id, thread_id),
                Err(e) => warn!("Failed to add {} to thread {}: {}", user_id, thread_id, e),
            }
        }
    }

    /// A remembered thread for this pair that could be reopened
    async fn reusable_thread(&self, reuse: &ThreadReuse, key: &str) -> Option<ChannelId> {
        let thread_id = reuse.lookup(key).await?;
        if self.api.unarchive_thread(thread_id).await {
            return Some(thread_id);
        }
        warn!("Stored thread {} for '{}' is unusable, creating a new one", thread_id, key);
        None
    }
}

#[async_trait]
impl OutboundChannel for BotChannel {
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        let (title, members, reuse_key) = match &notification.target {
            DeliveryTarget::Channel => {
                let message_id = self
                    .api
                    .post_message(self.channel_id, &notification.content, &notification.mentioned_ids)
                    .await?;
                return Ok(DeliveryReceipt::Channel {
                    message_id: Some(message_id.to_string()),
                });
            }
            DeliveryTarget::PrivateThread {
                title,
                members,
                reuse_key,
            } => (title, members, reuse_key),
        };

        let reuse = match (&self.reuse, reuse_key) {
            (Some(reuse), Some(key)) => Some((reuse, key.as_str())),
            _ => None,
        };

        if let Some((reuse, key)) = reuse {
            if let Some(thread_id) = self.reusable_thread(reuse, key).await {
                self.add_members(thread_id, members).await;
                self.api
                    .post_message(thread_id, &notification.content, &notification.mentioned_ids)
                    .await?;
                return Ok(DeliveryReceipt::ExistingThread {
                    thread_id: thread_id.to_string(),
                });
            }
        }

        let thread_id = self.api.create_private_thread(self.channel_id, title).await?;
        if let Some((reuse, key)) = reuse {
            reuse.remember(key, thread_id).await;
        }
        self.add_members(thread_id, members).await;
        self.api
            .post_message(thread_id, &notification.content, &notification.mentioned_ids)
            .await?;

        Ok(DeliveryReceipt::NewThread {
            thread_id: thread_id.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        if self.reuse.is_some() {
            "bot-thread"
        } else {
            "bot"
        }
    }
}

//! Delivery of match notifications to Discord
//!
//! The notifier only needs "post this text, pinging these users, here".
//! Whether that is an incoming-webhook post, a bot message, or a private
//! thread is decided by the configured [`OutboundChannel`].

mod bot;
pub(crate) mod discord;
mod webhook;

pub use bot::{BotChannel, ThreadReuse};
pub use discord::{ArchivedThread, DiscordApi, Removal, SerenityApi, SharedDiscordApi};
pub use webhook::WebhookChannel;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;

/// Where a notification should land
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// The configured channel
    Channel,
    /// A private thread under the configured channel with these members
    PrivateThread {
        title: String,
        members: BTreeSet<String>,
        /// Store key under which the thread id is remembered for reuse
        reuse_key: Option<String>,
    },
}

/// A composed message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub content: String,
    /// Users the message is allowed to ping; nobody else is
    pub mentioned_ids: BTreeSet<String>,
    pub target: DeliveryTarget,
}

/// What the transport did with a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "posted_in", rename_all = "snake_case")]
pub enum DeliveryReceipt {
    Channel {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    NewThread {
        thread_id: String,
    },
    ExistingThread {
        thread_id: String,
    },
}

/// Side-effecting "deliver this message to these users" operation.
///
/// A single call either delivers or fails; there is no internal retry.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt>;

    /// Short transport name for logs
    fn name(&self) -> &'static str;
}

pub type SharedOutboundChannel = Arc<dyn OutboundChannel>;

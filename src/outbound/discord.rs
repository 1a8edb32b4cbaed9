//! Thin seam over the Discord REST calls the bot transport needs

use async_trait::async_trait;
use serenity::all::{
    AutoArchiveDuration, ChannelId, ChannelType, CreateAllowedMentions, CreateMessage,
    CreateThread, EditThread, GetMessages, Http, MessageId, UserId,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{NotifierError, Result};

/// Auto-archive durations Discord accepts, tried in order
const ARCHIVE_DURATIONS: [AutoArchiveDuration; 4] = [
    AutoArchiveDuration::OneHour,
    AutoArchiveDuration::OneDay,
    AutoArchiveDuration::ThreeDays,
    AutoArchiveDuration::OneWeek,
];

/// Discord returns at most this many items per page
const PAGE_LIMIT: u8 = 100;

/// Result of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// Discord answered 404
    AlreadyGone,
}

/// An archived private thread under a parent channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedThread {
    pub id: ChannelId,
    /// Unix seconds
    pub archived_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub content: String,
}

#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Post `content`, allowed to ping exactly `mentioned_ids`
    async fn post_message(
        &self,
        channel_id: ChannelId,
        content: &str,
        mentioned_ids: &BTreeSet<String>,
    ) -> Result<MessageId>;

    async fn create_private_thread(&self, parent_id: ChannelId, title: &str) -> Result<ChannelId>;

    /// Reopen an archived thread; `false` when Discord refuses every attempt
    async fn unarchive_thread(&self, thread_id: ChannelId) -> bool;

    /// Adding someone who is already a member succeeds
    async fn add_thread_member(&self, thread_id: ChannelId, user_id: UserId) -> Result<()>;

    async fn archived_private_threads(&self, parent_id: ChannelId) -> Result<Vec<ArchivedThread>>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<Removal>;

    /// One page of messages, newest first, older than `before` when given
    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        before: Option<MessageId>,
    ) -> Result<Vec<ChannelMessage>>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Removal>;
}

pub type SharedDiscordApi = Arc<dyn DiscordApi>;

/// [`DiscordApi`] over serenity's HTTP client
pub struct SerenityApi {
    http: Arc<Http>,
}

impl SerenityApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscordApi for SerenityApi {
    async fn post_message(
        &self,
        channel_id: ChannelId,
        content: &str,
        mentioned_ids: &BTreeSet<String>,
    ) -> Result<MessageId> {
        let mentions = CreateAllowedMentions::new().users(
            mentioned_ids
                .iter()
                .filter_map(|id| parse_snowflake(id))
                .map(UserId::new),
        );
        let builder = CreateMessage::new().content(content).allowed_mentions(mentions);

        let message = channel_id.send_message(&self.http, builder).await.map_err(|e| {
            error!("Failed to post in {}: {}", channel_id, e);
            e
        })?;
        info!("Posted in {}: {}", channel_id, message.id);
        Ok(message.id)
    }

    async fn create_private_thread(&self, parent_id: ChannelId, title: &str) -> Result<ChannelId> {
        let mut last_error = None;
        for duration in ARCHIVE_DURATIONS {
            let builder = CreateThread::new(title)
                .kind(ChannelType::PrivateThread)
                .invitable(false)
                .auto_archive_duration(duration);

            match parent_id.create_thread(&self.http, builder).await {
                Ok(thread) => {
                    info!("Created thread '{}' -> {} ({:?})", title, thread.id, duration);
                    return Ok(thread.id);
                }
                Err(e) => {
                    warn!("Thread create failed ({:?}): {}", duration, e);
                    last_error = Some(e);
                }
            }
        }
        Err(match last_error {
            Some(e) => e.into(),
            None => NotifierError::delivery("thread creation failed"),
        })
    }

    async fn unarchive_thread(&self, thread_id: ChannelId) -> bool {
        for duration in ARCHIVE_DURATIONS {
            let builder = EditThread::new()
                .archived(false)
                .locked(false)
                .auto_archive_duration(duration);
            match thread_id.edit_thread(&self.http, builder).await {
                Ok(_) => {
                    info!("Unarchived thread {} ({:?})", thread_id, duration);
                    return true;
                }
                Err(e) => warn!("Unarchive of {} failed ({:?}): {}", thread_id, duration, e),
            }
        }
        false
    }

    async fn add_thread_member(&self, thread_id: ChannelId, user_id: UserId) -> Result<()> {
        match thread_id.add_thread_member(&self.http, user_id).await {
            Ok(()) => Ok(()),
            Err(e) if discord_status(&e) == Some(409) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn archived_private_threads(&self, parent_id: ChannelId) -> Result<Vec<ArchivedThread>> {
        let archived = parent_id
            .get_archived_private_threads(&self.http, None, Some(u64::from(PAGE_LIMIT)))
            .await?;

        Ok(archived
            .threads
            .into_iter()
            .map(|thread| ArchivedThread {
                id: thread.id,
                archived_at: thread
                    .thread_metadata
                    .and_then(|meta| meta.archive_timestamp)
                    .map(|ts| ts.unix_timestamp()),
            })
            .collect())
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<Removal> {
        match channel_id.delete(&self.http).await {
            Ok(_) => Ok(Removal::Deleted),
            Err(e) if discord_status(&e) == Some(404) => Ok(Removal::AlreadyGone),
            Err(e) => Err(e.into()),
        }
    }

    async fn recent_messages(
        &self,
        channel_id: ChannelId,
        before: Option<MessageId>,
    ) -> Result<Vec<ChannelMessage>> {
        let mut builder = GetMessages::new().limit(PAGE_LIMIT);
        if let Some(before) = before {
            builder = builder.before(before);
        }

        let messages = channel_id.messages(&self.http, builder).await?;
        Ok(messages
            .into_iter()
            .map(|m| ChannelMessage {
                id: m.id,
                content: m.content,
            })
            .collect())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Removal> {
        match channel_id.delete_message(&self.http, message_id).await {
            Ok(()) => Ok(Removal::Deleted),
            Err(e) if discord_status(&e) == Some(404) => Ok(Removal::AlreadyGone),
            Err(e) => Err(e.into()),
        }
    }
}

/// Discord snowflakes are non-zero u64s
pub(crate) fn parse_snowflake(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

/// HTTP status of a failed Discord API call, if it got that far
fn discord_status(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(http_error) => http_error.status_code().map(|s| s.as_u16()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Every call the fake saw, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Post { channel: u64, content: String },
        CreateThread { parent: u64, title: String },
        Unarchive(u64),
        AddMember { thread: u64, user: u64 },
        DeleteChannel(u64),
        ListMessages { channel: u64, before: Option<u64> },
        DeleteMessage { channel: u64, message: u64 },
    }

    /// Scripted Discord: ids are handed out from a counter, everything is recorded
    pub(crate) struct FakeDiscord {
        pub(crate) calls: Mutex<Vec<Call>>,
        next_id: Mutex<u64>,
        /// Threads that refuse to unarchive
        pub(crate) stuck_threads: Mutex<BTreeSet<u64>>,
        pub(crate) archived: Mutex<Vec<ArchivedThread>>,
        /// Channel ids whose delete answers 404
        pub(crate) gone: Mutex<BTreeSet<u64>>,
        /// Channel ids whose delete fails outright
        pub(crate) undeletable: Mutex<BTreeSet<u64>>,
        /// Message history per channel, newest first
        pub(crate) history: Mutex<HashMap<u64, Vec<ChannelMessage>>>,
    }

    impl Default for FakeDiscord {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_id: Mutex::new(1000),
                stuck_threads: Mutex::new(BTreeSet::new()),
                archived: Mutex::new(Vec::new()),
                gone: Mutex::new(BTreeSet::new()),
                undeletable: Mutex::new(BTreeSet::new()),
                history: Mutex::new(HashMap::new()),
            }
        }
    }

    impl FakeDiscord {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn fresh_id(&self) -> u64 {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        }

        fn removal(&self, id: u64) -> Result<Removal> {
            if self.undeletable.lock().unwrap().contains(&id) {
                return Err(NotifierError::Discord {
                    message: "403 Missing Permissions".to_string(),
                });
            }
            if self.gone.lock().unwrap().contains(&id) {
                return Ok(Removal::AlreadyGone);
            }
            Ok(Removal::Deleted)
        }
    }

    #[async_trait]
    impl DiscordApi for FakeDiscord {
        async fn post_message(
            &self,
            channel_id: ChannelId,
            content: &str,
            _mentioned_ids: &BTreeSet<String>,
        ) -> Result<MessageId> {
            self.record(Call::Post {
                channel: channel_id.get(),
                content: content.to_string(),
            });
            Ok(MessageId::new(self.fresh_id()))
        }

        async fn create_private_thread(
            &self,
            parent_id: ChannelId,
            title: &str,
        ) -> Result<ChannelId> {
            self.record(Call::CreateThread {
                parent: parent_id.get(),
                title: title.to_string(),
            });
            Ok(ChannelId::new(self.fresh_id()))
        }

        async fn unarchive_thread(&self, thread_id: ChannelId) -> bool {
            self.record(Call::Unarchive(thread_id.get()));
            !self.stuck_threads.lock().unwrap().contains(&thread_id.get())
        }

        async fn add_thread_member(&self, thread_id: ChannelId, user_id: UserId) -> Result<()> {
            self.record(Call::AddMember {
                thread: thread_id.get(),
                user: user_id.get(),
            });
            Ok(())
        }

        async fn archived_private_threads(
            &self,
            _parent_id: ChannelId,
        ) -> Result<Vec<ArchivedThread>> {
            Ok(self.archived.lock().unwrap().clone())
        }

        async fn delete_channel(&self, channel_id: ChannelId) -> Result<Removal> {
            self.record(Call::DeleteChannel(channel_id.get()));
            self.removal(channel_id.get())
        }

        async fn recent_messages(
            &self,
            channel_id: ChannelId,
            before: Option<MessageId>,
        ) -> Result<Vec<ChannelMessage>> {
            self.record(Call::ListMessages {
                channel: channel_id.get(),
                before: before.map(|id| id.get()),
            });
            let history = self.history.lock().unwrap();
            let messages = history.get(&channel_id.get()).cloned().unwrap_or_default();
            let start = match before {
                Some(before) => messages
                    .iter()
                    .position(|m| m.id == before)
                    .map(|i| i + 1)
                    .unwrap_or(messages.len()),
                None => 0,
            };
            Ok(messages
                .into_iter()
                .skip(start)
                .take(usize::from(PAGE_LIMIT))
                .collect())
        }

        async fn delete_message(
            &self,
            channel_id: ChannelId,
            message_id: MessageId,
        ) -> Result<Removal> {
            self.record(Call::DeleteMessage {
                channel: channel_id.get(),
                message: message_id.get(),
            });
            self.removal(message_id.get())
        }
    }

    #[test]
    fn test_parse_snowflake() {
        assert_eq!(parse_snowflake("123456789012345678"), Some(123456789012345678));
        assert_eq!(parse_snowflake(" 42 "), Some(42));
        assert_eq!(parse_snowflake("0"), None);
        assert_eq!(parse_snowflake("U1"), None);
    }

    #[tokio::test]
    async fn test_fake_pages_history() {
        let fake = FakeDiscord::default();
        let messages: Vec<ChannelMessage> = (1..=150u64)
            .rev()
            .map(|id| ChannelMessage {
                id: MessageId::new(id),
                content: format!("m{}", id),
            })
            .collect();
        fake.history.lock().unwrap().insert(7, messages);

        let first = fake.recent_messages(ChannelId::new(7), None).await.unwrap();
        assert_eq!(first.len(), 100);
        let second = fake
            .recent_messages(ChannelId::new(7), Some(first[99].id))
            .await
            .unwrap();
        assert_eq!(second.len(), 50);
        assert_eq!(second[0].id, MessageId::new(50));
    }
}

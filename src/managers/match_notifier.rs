use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{error, info};

use crate::error::{bounded, Result};
use crate::messages;
use crate::models::{MatchOutcome, MatchStartEvent, NotificationSummary};
use crate::outbound::{DeliveryTarget, Notification, SharedOutboundChannel};
use crate::state::{normalize_name, IdentityStore};

/// Key prefix for remembered per-pair threads
pub const THREAD_PAIR_PREFIX: &str = "threadpair:";

/// Turns match-start events into notifications for the two players
#[derive(Clone)]
pub struct MatchNotifier {
    store: IdentityStore,
    outbound: SharedOutboundChannel,
    use_threads: bool,
    delivery_timeout: Duration,
}

impl MatchNotifier {
    pub fn new(
        store: IdentityStore,
        outbound: SharedOutboundChannel,
        use_threads: bool,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            store,
            outbound,
            use_threads,
            delivery_timeout,
        }
    }

    /// Resolve both players and deliver one notification.
    ///
    /// Unlinked players are named in plain text; that is never a failure.
    /// Only store or delivery errors (including timeouts) are returned.
    pub async fn notify(&self, event: &MatchStartEvent) -> Result<NotificationSummary> {
        let (first, second) = futures::future::try_join(
            self.store.get(&event.player_one),
            self.store.get(&event.player_two),
        )
        .await?;

        let outcome = MatchOutcome::classify(first.is_some(), second.is_some());
        info!(
            "Resolved {}={} {}={} ({:?})",
            event.player_one,
            first.as_deref().unwrap_or("N/A"),
            event.player_two,
            second.as_deref().unwrap_or("N/A"),
            outcome
        );

        let notification = self.compose(event, first.as_deref(), second.as_deref());
        let mentioned: Vec<String> = notification.mentioned_ids.iter().cloned().collect();

        let delivery = bounded(
            "match notification delivery",
            self.delivery_timeout,
            self.outbound.send(&notification),
        )
        .await
        .map_err(|e| {
            error!("Delivery via {} failed: {}", self.outbound.name(), e);
            e
        })?;

        Ok(NotificationSummary {
            ok: true,
            outcome,
            mentioned,
            delivery,
        })
    }

    fn compose(
        &self,
        event: &MatchStartEvent,
        first: Option<&str>,
        second: Option<&str>,
    ) -> Notification {
        let content = messages::match_started_message(
            &render_player(&event.player_one, first),
            &render_player(&event.player_two, second),
            &event.started_at,
        );

        let mentioned_ids: BTreeSet<String> =
            first.into_iter().chain(second).map(|id| id.to_string()).collect();

        // A private thread nobody can be added to would hide the match
        let target = if self.use_threads && !mentioned_ids.is_empty() {
            DeliveryTarget::PrivateThread {
                title: messages::match_thread_title(&event.player_one, &event.player_two),
                members: mentioned_ids.clone(),
                reuse_key: Some(pair_key(&event.player_one, &event.player_two)),
            }
        } else {
            DeliveryTarget::Channel
        };

        Notification {
            content,
            mentioned_ids,
            target,
        }
    }
}

/// Mention a linked player, otherwise name them literally
fn render_player(name: &str, discord_id: Option<&str>) -> String {
    match discord_id {
        Some(id) => messages::mention(id),
        None => messages::escape_markdown(name),
    }
}

/// Order-independent store key for a pair of players
pub fn pair_key(player_one: &str, player_two: &str) -> String {
    let mut names = [normalize_name(player_one), normalize_name(player_two)];
    names.sort();
    format!("{}{}|{}", THREAD_PAIR_PREFIX, names[0], names[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifierError;
    use crate::outbound::tests::RecordingChannel;
    use crate::outbound::DeliveryReceipt;
    use crate::state::kv::tests::{CountingKv, FailingKv};
    use crate::state::MemoryKv;
    use std::sync::Arc;

    fn event(one: &str, two: &str) -> MatchStartEvent {
        MatchStartEvent {
            player_one: one.to_string(),
            player_two: two.to_string(),
            started_at: "2025-08-31 10:21:15 UTC".to_string(),
        }
    }

    async fn setup(
        links: &[(&str, &str)],
        use_threads: bool,
    ) -> (MatchNotifier, Arc<RecordingChannel>) {
        let store = IdentityStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(1));
        for (name, id) in links {
            store.put(name, id).await.unwrap();
        }
        let channel = Arc::new(RecordingChannel::default());
        let notifier = MatchNotifier::new(store, channel.clone(), use_threads, Duration::from_secs(1));
        (notifier, channel)
    }

    #[tokio::test]
    async fn test_full_match_mentions_both() {
        let (notifier, channel) =
            setup(&[("megaflop", "U1"), ("StanCifka", "U2")], false).await;

        let summary = notifier.notify(&event("megaflop", "StanCifka")).await.unwrap();

        assert_eq!(summary.outcome, MatchOutcome::FullMatch);
        assert_eq!(summary.mentioned, vec!["U1".to_string(), "U2".to_string()]);

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.contains("<@U1> vs <@U2>"));
        assert!(sent[0].content.contains("2025-08-31 10:21:15 UTC"));
        assert_eq!(sent[0].target, DeliveryTarget::Channel);
    }

    #[tokio::test]
    async fn test_partial_match_degrades_gracefully() {
        let (notifier, channel) = setup(&[("StanCifka", "U2")], false).await;

        let summary = notifier.notify(&event("megaflop", "StanCifka")).await.unwrap();

        assert!(summary.ok);
        assert_eq!(summary.outcome, MatchOutcome::PartialMatch);
        let sent = &channel.sent()[0];
        assert!(sent.content.contains("megaflop vs <@U2>"));
        assert_eq!(sent.mentioned_ids.len(), 1);
        assert!(sent.mentioned_ids.contains("U2"));
    }

    #[tokio::test]
    async fn test_no_match_still_delivers() {
        let (notifier, channel) = setup(&[], true).await;

        let summary = notifier.notify(&event("megaflop", "StanCifka")).await.unwrap();

        assert_eq!(summary.outcome, MatchOutcome::NoMatch);
        assert!(summary.mentioned.is_empty());
        let sent = &channel.sent()[0];
        assert!(sent.content.contains("megaflop vs StanCifka"));
        assert!(!sent.content.contains("<@"));
        assert!(sent.mentioned_ids.is_empty());
        // Thread mode falls back to the channel when nobody can be added
        assert_eq!(sent.target, DeliveryTarget::Channel);
    }

    #[tokio::test]
    async fn test_lookup_uses_store_normalization() {
        let (notifier, channel) = setup(&[("megaflop", "U1")], false).await;

        let summary = notifier.notify(&event("MEGAFLOP", "someone")).await.unwrap();

        assert_eq!(summary.outcome, MatchOutcome::PartialMatch);
        assert!(channel.sent()[0].content.contains("<@U1> vs someone"));
    }

    #[tokio::test]
    async fn test_same_account_on_both_sides_is_mentioned_once() {
        let (notifier, channel) = setup(&[("alt", "U1"), ("main", "U1")], false).await;

        let summary = notifier.notify(&event("main", "alt")).await.unwrap();

        assert_eq!(summary.outcome, MatchOutcome::FullMatch);
        assert_eq!(channel.sent()[0].mentioned_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_thread_target_in_thread_mode() {
        let (notifier, channel) =
            setup(&[("megaflop", "U1"), ("StanCifka", "U2")], true).await;

        let summary = notifier.notify(&event("megaflop", "StanCifka")).await.unwrap();

        assert_eq!(
            summary.delivery,
            DeliveryReceipt::NewThread {
                thread_id: "T1".to_string()
            }
        );
        match &channel.sent()[0].target {
            DeliveryTarget::PrivateThread {
                title,
                members,
                reuse_key,
            } => {
                assert_eq!(title, "megaflop vs StanCifka");
                assert_eq!(members.len(), 2);
                assert_eq!(reuse_key.as_deref(), Some("threadpair:megaflop|stancifka"));
            }
            other => panic!("expected a thread target, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_player_names_cannot_inject_mentions() {
        let (notifier, channel) = setup(&[], false).await;

        notifier.notify(&event("@everyone", "<@999>")).await.unwrap();

        let sent = &channel.sent()[0];
        assert!(!sent.content.contains("@everyone"));
        assert!(!sent.content.contains("<@999>"));
        assert!(sent.mentioned_ids.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_an_error() {
        let store = IdentityStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(1));
        let channel = Arc::new(RecordingChannel::failing("401 Unauthorized"));
        let notifier = MatchNotifier::new(store, channel, false, Duration::from_secs(1));

        let err = notifier.notify(&event("a", "b")).await.unwrap_err();
        assert!(matches!(err, NotifierError::Delivery { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_skips_delivery() {
        let store = IdentityStore::new(Arc::new(FailingKv), Duration::from_secs(1));
        let channel = Arc::new(RecordingChannel::default());
        let notifier = MatchNotifier::new(store, channel.clone(), false, Duration::from_secs(1));

        let err = notifier.notify(&event("a", "b")).await.unwrap_err();
        assert!(err.is_transport());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_never_writes() {
        let kv = Arc::new(CountingKv::default());
        let store = IdentityStore::new(kv.clone(), Duration::from_secs(1));
        let notifier = MatchNotifier::new(
            store,
            Arc::new(RecordingChannel::default()),
            true,
            Duration::from_secs(1),
        );

        notifier.notify(&event("a", "b")).await.unwrap();
        assert_eq!(kv.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(kv.reads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key("megaflop", "StanCifka"), pair_key(" stancifka", "MEGAFLOP"));
    }
}

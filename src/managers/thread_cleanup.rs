use chrono::{DateTime, Utc};
use serde::Serialize;
use serenity::all::ChannelId;
use tracing::{info, warn};

use crate::error::{NotifierError, Result};
use crate::outbound::{Removal, SharedDiscordApi};

/// Upper bound for `?days=N`; ten years covers any real retention window
pub const MAX_CLEANUP_DAYS: u32 = 3650;

/// Summary of one cleanup run
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub channel_id: String,
    pub cutoff_iso: String,
    pub days: u32,
    pub checked: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
}

/// Deletes archived private match threads older than a cutoff
#[derive(Clone)]
pub struct ThreadCleanup {
    api: SharedDiscordApi,
    channel_id: ChannelId,
}

impl ThreadCleanup {
    pub fn new(api: SharedDiscordApi, channel_id: u64) -> Self {
        Self {
            api,
            channel_id: ChannelId::new(channel_id),
        }
    }

    pub async fn run(&self, days: u32) -> Result<CleanupReport> {
        self.run_at(Utc::now(), days).await
    }

    async fn run_at(&self, now: DateTime<Utc>, days: u32) -> Result<CleanupReport> {
        let cutoff = cutoff_for(now, days)?;
        let archived = self.api.archived_private_threads(self.channel_id).await?;

        let mut report = CleanupReport {
            channel_id: self.channel_id.to_string(),
            cutoff_iso: cutoff.to_rfc3339(),
            days,
            checked: 0,
            deleted: 0,
            errors: Vec::new(),
        };

        for thread in archived {
            report.checked += 1;
            if !archived_before(thread.archived_at, &cutoff) {
                continue;
            }

            match self.api.delete_channel(thread.id).await {
                Ok(Removal::Deleted) => report.deleted += 1,
                Ok(Removal::AlreadyGone) => {
                    info!("Thread {} was already gone", thread.id);
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to delete thread {}: {}", thread.id, e);
                    report.errors.push(format!("delete {}: {}", thread.id, e));
                }
            }
        }

        info!(
            "Thread cleanup in {}: checked {}, deleted {}, {} errors",
            report.channel_id,
            report.checked,
            report.deleted,
            report.errors.len()
        );
        Ok(report)
    }
}

fn cutoff_for(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    chrono::Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| NotifierError::validation(format!("days={} is out of range", days)))
}

/// Threads without an archive timestamp are never deleted
fn archived_before(archived_at_unix: Option<i64>, cutoff: &DateTime<Utc>) -> bool {
    archived_at_unix.is_some_and(|ts| ts < cutoff.timestamp())
}

/// `?days=N`, defaulting to 1 and kept within `1..=MAX_CLEANUP_DAYS`
pub fn parse_days(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .map(|d| d.clamp(1, MAX_CLEANUP_DAYS))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::discord::tests::{Call, FakeDiscord};
    use crate::outbound::ArchivedThread;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap()
    }

    fn archived(id: u64, age: chrono::Duration) -> ArchivedThread {
        ArchivedThread {
            id: ChannelId::new(id),
            archived_at: Some((now() - age).timestamp()),
        }
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days(None), 1);
        assert_eq!(parse_days(Some("7")), 7);
        assert_eq!(parse_days(Some("0")), 1);
        assert_eq!(parse_days(Some("-3")), 1);
        assert_eq!(parse_days(Some("soon")), 1);
        assert_eq!(parse_days(Some("100000000")), MAX_CLEANUP_DAYS);
    }

    #[test]
    fn test_huge_day_counts_do_not_overflow() {
        assert!(cutoff_for(now(), parse_days(Some("100000000"))).is_ok());
        assert!(cutoff_for(Utc::now(), parse_days(Some("4294967295"))).is_ok());
        assert!(matches!(
            cutoff_for(now(), u32::MAX),
            Err(NotifierError::Validation { .. })
        ));
    }

    #[test]
    fn test_cutoff_selection() {
        let cutoff = cutoff_for(now(), 2).unwrap();
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 9, 8, 12, 0, 0).unwrap());

        let three_days_ago = (now() - chrono::Duration::days(3)).timestamp();
        let one_hour_ago = (now() - chrono::Duration::hours(1)).timestamp();

        assert!(archived_before(Some(three_days_ago), &cutoff));
        assert!(!archived_before(Some(one_hour_ago), &cutoff));
        assert!(!archived_before(None, &cutoff));
    }

    #[tokio::test]
    async fn test_run_deletes_only_old_threads() {
        let fake = Arc::new(FakeDiscord::default());
        *fake.archived.lock().unwrap() = vec![
            archived(1, chrono::Duration::days(3)),
            archived(2, chrono::Duration::hours(2)),
            ArchivedThread {
                id: ChannelId::new(3),
                archived_at: None,
            },
        ];
        let cleanup = ThreadCleanup::new(fake.clone(), 500);

        let report = cleanup.run_at(now(), 1).await.unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.deleted, 1);
        assert!(report.errors.is_empty());
        assert_eq!(fake.calls(), vec![Call::DeleteChannel(1)]);
    }

    #[tokio::test]
    async fn test_already_gone_counts_as_deleted() {
        let fake = Arc::new(FakeDiscord::default());
        *fake.archived.lock().unwrap() = vec![
            archived(1, chrono::Duration::days(5)),
            archived(2, chrono::Duration::days(5)),
        ];
        fake.gone.lock().unwrap().insert(2);
        let cleanup = ThreadCleanup::new(fake.clone(), 500);

        let report = cleanup.run_at(now(), 1).await.unwrap();

        assert_eq!(report.deleted, 2);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failed_deletes_are_reported_not_fatal() {
        let fake = Arc::new(FakeDiscord::default());
        *fake.archived.lock().unwrap() = vec![
            archived(1, chrono::Duration::days(5)),
            archived(2, chrono::Duration::days(5)),
        ];
        fake.undeletable.lock().unwrap().insert(1);
        let cleanup = ThreadCleanup::new(fake.clone(), 500);

        let report = cleanup.run_at(now(), 1).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("delete 1"));
    }
}

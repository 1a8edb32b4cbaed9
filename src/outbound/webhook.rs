use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use super::{DeliveryReceipt, DeliveryTarget, Notification, OutboundChannel};
use crate::commands::AllowedMentions;
use crate::error::{NotifierError, Result};

/// Posts through a Discord incoming webhook URL
pub struct WebhookChannel {
    url: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

/// The message object returned when posting with `?wait=true`
#[derive(Deserialize)]
struct PostedMessage {
    id: String,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::delivery(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl OutboundChannel for WebhookChannel {
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        if let DeliveryTarget::PrivateThread { title, .. } = &notification.target {
            // Webhooks cannot open private threads; post in the channel instead
            warn!("Webhook delivery cannot create thread '{}', posting to channel", title);
        }

        let payload = WebhookPayload {
            content: &notification.content,
            allowed_mentions: AllowedMentions::users(notification.mentioned_ids.iter().cloned()),
        };

        let response = self
            .http_client
            .post(&self.url)
            .query(&[("wait", "true")])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Webhook post failed: {}", e);
                NotifierError::delivery(format!("webhook request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Webhook post rejected: {} - {}", status, text);
            return Err(NotifierError::delivery(format!(
                "webhook returned {}: {}",
                status,
                text.chars().take(300).collect::<String>()
            )));
        }

        let message_id = response.json::<PostedMessage>().await.ok().map(|m| m.id);
        info!("Posted match notification via webhook: {:?}", message_id);

        Ok(DeliveryReceipt::Channel { message_id })
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

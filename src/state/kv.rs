use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{NotifierError, Result};

/// Narrow get/set interface over the external key-value store.
///
/// Implementations must make a single `get` or `set` atomic per key; nothing
/// here needs cross-key transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

pub type SharedKeyValueStore = Arc<dyn KeyValueStore>;

/// In-process store, used for local runs and tests
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Redis over Upstash's path-style REST API (`/get/<key>`, `/set/<key>/<value>`)
pub struct UpstashKv {
    base_url: String,
    token: String,
    http_client: reqwest::Client,
}

/// Upstash wraps every reply in `{"result": ...}` or `{"error": "..."}`
#[derive(Deserialize)]
struct UpstashReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashKv {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::store(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http_client,
        })
    }

    async fn command(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| NotifierError::store(format!("request failed: {}", e)))?;

        let status = response.status();
        let reply: UpstashReply = response
            .json()
            .await
            .map_err(|e| NotifierError::store(format!("unreadable reply ({}): {}", status, e)))?;

        if let Some(error) = reply.error {
            return Err(NotifierError::store(error));
        }
        if !status.is_success() {
            return Err(NotifierError::store(format!("HTTP {}", status)));
        }
        Ok(reply.result)
    }
}

#[async_trait]
impl KeyValueStore for UpstashKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = format!("/get/{}", urlencoding::encode(key));
        let value = self.command(&path).await?;
        debug!("GET {} -> {}", key, if value.is_some() { "hit" } else { "miss" });

        Ok(match value {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = format!(
            "/set/{}/{}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        );
        match self.command(&path).await? {
            Some(serde_json::Value::String(ref s)) if s == "OK" => {
                debug!("SET {} -> OK", key);
                Ok(())
            }
            other => Err(NotifierError::store(format!(
                "SET {} was not acknowledged: {:?}",
                key, other
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = format!("/del/{}", urlencoding::encode(key));
        let removed = self.command(&path).await?;
        debug!("DEL {} -> {:?}", key, removed);
        Ok(())
    }
}

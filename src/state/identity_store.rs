use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::kv::SharedKeyValueStore;
use crate::error::{bounded, Result};

/// Key prefix for player name -> Discord user id links
pub const PLAYER_LINK_PREFIX: &str = "playerlink:";

/// Case-fold and trim a player name.
///
/// Only the identity store should key on this; everything else hands raw
/// names to the store.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A player name linked to a Discord account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerLink {
    pub normalized_name: String,
    pub discord_user_id: String,
}

/// Player name -> Discord identity mapping, last writer wins
#[derive(Clone)]
pub struct IdentityStore {
    kv: SharedKeyValueStore,
    timeout: Duration,
}

impl IdentityStore {
    pub fn new(kv: SharedKeyValueStore, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    fn key_for(normalized_name: &str) -> String {
        format!("{}{}", PLAYER_LINK_PREFIX, normalized_name)
    }

    /// Link `name` to `discord_user_id`, replacing whatever it pointed at before
    pub async fn put(&self, name: &str, discord_user_id: &str) -> Result<PlayerLink> {
        let normalized_name = normalize_name(name);
        let key = Self::key_for(&normalized_name);

        bounded("identity store write", self.timeout, self.kv.set(&key, discord_user_id)).await?;
        info!("Linked player '{}' to {}", normalized_name, discord_user_id);

        Ok(PlayerLink {
            normalized_name,
            discord_user_id: discord_user_id.to_string(),
        })
    }

    /// Look up the Discord user id linked to `name`
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let key = Self::key_for(&normalize_name(name));
        let raw = bounded("identity store read", self.timeout, self.kv.get(&key)).await?;
        debug!("Resolved '{}' -> {:?}", key, raw);

        Ok(raw.and_then(|value| parse_stored_id(&value)))
    }
}

/// Stored values are plain ids; older writers stored `{"id": "..."}` objects
fn parse_stored_id(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with('{') {
        return serde_json::from_str::<serde_json::Value>(value)
            .ok()?
            .get("id")?
            .as_str()
            .map(|s| s.to_string());
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::kv::{KeyValueStore, MemoryKv};
    use std::sync::Arc;

    fn store_with(kv: Arc<MemoryKv>) -> IdentityStore {
        IdentityStore::new(kv, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.put("StanCifka", "U2").await.unwrap();

        for name in ["StanCifka", "stancifka", "STANCIFKA", "  stanCIFKA "] {
            assert_eq!(store.get(name).await.unwrap(), Some("U2".to_string()), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.put("megaflop", "U1").await.unwrap();
        store.put("Megaflop", "U2").await.unwrap();

        assert_eq!(store.get("MEGAFLOP").await.unwrap(), Some("U2".to_string()));
    }

    #[tokio::test]
    async fn test_put_returns_normalized_link_and_uses_prefixed_key() {
        let kv = Arc::new(MemoryKv::new());
        let store = store_with(kv.clone());

        let link = store.put("  MegaFlop ", "U1").await.unwrap();
        assert_eq!(
            link,
            PlayerLink {
                normalized_name: "megaflop".to_string(),
                discord_user_id: "U1".to_string(),
            }
        );
        assert_eq!(kv.get("playerlink:megaflop").await.unwrap(), Some("U1".to_string()));
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_none() {
        let store = store_with(Arc::new(MemoryKv::new()));
        assert_eq!(store.get("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_legacy_json_values() {
        let kv = Arc::new(MemoryKv::new());
        kv.set("playerlink:oldtimer", r#"{"id":"U9","name":"OldTimer"}"#)
            .await
            .unwrap();
        kv.set("playerlink:broken", "{not json").await.unwrap();

        let store = store_with(kv);
        assert_eq!(store.get("OldTimer").await.unwrap(), Some("U9".to_string()));
        assert_eq!(store.get("broken").await.unwrap(), None);
    }
}

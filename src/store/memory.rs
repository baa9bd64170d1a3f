//! In-memory key-value store
//!
//! This is primarily for development and testing.
//! For production, use RedisStore or another persistent store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::traits::PONG;
use super::KeyValueStore;
use crate::error::SessionError;

struct StoredValue {
    data: Vec<u8>,
    // None when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory key-value store with per-key TTL
///
/// Warning: This store is not suitable for production use because:
/// - Sessions are lost on server restart
/// - Sessions are not shared across multiple server instances
/// - Expired entries are only dropped by [`MemoryStore::cleanup_expired`]
///
/// Clones share the same underlying map, so two engines built from clones of
/// one store behave like two applications sharing a Redis instance.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, stored| stored.is_live(now));
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|s| s.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live keys, prefixes included
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, s)| s.is_live(now))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), SessionError> {
        let stored = StoredValue {
            data: value.to_vec(),
            expires_at: Instant::now().checked_add(Duration::from_secs(ttl_secs)),
        };
        self.entries.write().insert(key.to_string(), stored);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|stored| stored.is_live(Instant::now()))
            .map(|stored| stored.data.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<String, SessionError> {
        Ok(PONG.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Keyring, SaveOutcome, SessionEngine};

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.set_with_ttl("session_a", b"payload", 3600).await.unwrap();
        assert_eq!(
            store.get("session_a").await.unwrap(),
            Some(b"payload".to_vec())
        );
        assert_eq!(store.keys(), vec!["session_a".to_string()]);

        store.delete("session_a").await.unwrap();
        assert!(store.get("session_a").await.unwrap().is_none());

        // Deleting a missing key is fine
        store.delete("session_a").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();

        store.set_with_ttl("session_a", b"payload", 0).await.unwrap(); // Already expired
        assert!(store.get("session_a").await.unwrap().is_none());
        assert!(store.is_empty());

        store.cleanup_expired();
        assert!(store.entries.read().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_huge_ttl_never_expires() {
        let store = MemoryStore::new();

        store.set_with_ttl("session_a", b"payload", u64::MAX).await.unwrap();
        assert_eq!(
            store.get("session_a").await.unwrap(),
            Some(b"payload".to_vec())
        );

        store.cleanup_expired();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_persists_with_max_age_at_limit() {
        let store = MemoryStore::new();
        let engine = SessionEngine::new(store.clone(), Keyring::new(["secret-key"]))
            .await
            .unwrap();

        let mut session = engine.new_session("sid");
        session.set("user", "alice").unwrap();
        session.options_mut().max_age = i64::MAX;

        let token = match engine.persist(&mut session).await.unwrap() {
            SaveOutcome::Token(token) => token,
            SaveOutcome::Clear => panic!("positive max age must not clear"),
        };
        assert_eq!(store.len(), 1);

        let loaded = engine.fetch_or_create(Some(&token), "sid").await.unwrap();
        assert_eq!(loaded.get::<String>("user"), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set_with_ttl("k", b"v", 60).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(other.ping().await.unwrap(), "PONG");
    }
}

//! Key-value store trait

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SessionError;

/// Reply expected from a healthy store on [`KeyValueStore::ping`]
pub const PONG: &str = "PONG";

/// The operations the session engine needs from a backing store.
///
/// Keys arrive fully prefixed; values are opaque serialized payloads.
/// Implementations must be safe to share between concurrent requests, and
/// every failure should surface as [`SessionError::Transport`].
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Store `value` under `key`, expiring after `ttl_secs`
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), SessionError>;

    /// Fetch the value under `key`
    ///
    /// Returns None if the key doesn't exist or has expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Delete `key`; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<(), SessionError>;

    /// Liveness probe, normally answered with [`PONG`]
    async fn ping(&self) -> Result<String, SessionError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), SessionError> {
        (**self).set_with_ttl(key, value, ttl_secs).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        (**self).delete(key).await
    }

    async fn ping(&self) -> Result<String, SessionError> {
        (**self).ping().await
    }
}

//! Redis key-value store
//!
//! - One URL connects through a [`ConnectionManager`], which reconnects on failure
//! - Several URLs are treated as seed nodes of a Redis Cluster
//! - Values are written with `SET key value EX ttl`

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{ConnectionInfo, FromRedisValue, IntoConnectionInfo};

use super::KeyValueStore;
use crate::error::SessionError;

#[derive(Clone)]
enum Connection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

/// Redis session backend
///
/// Cloning is cheap; clones share the underlying connection.
///
/// # Example
///
/// ```rust,ignore
/// use salvo_redis_session::RedisStore;
///
/// let store = RedisStore::connect(&["redis://127.0.0.1:6379"], false).await?;
/// ```
#[derive(Clone)]
pub struct RedisStore {
    conn: Connection,
}

impl RedisStore {
    /// Connect to one Redis node, or to a cluster when several URLs are given.
    ///
    /// With `use_tls`, `redis://` URLs are upgraded to `rediss://`.
    pub async fn connect<S: AsRef<str>>(urls: &[S], use_tls: bool) -> Result<Self, SessionError> {
        let nodes = parse_nodes(urls, use_tls)?;

        if nodes.len() == 1 {
            let client = redis::Client::open(nodes[0].clone()).map_err(|e| {
                SessionError::Configuration(format!("Failed to create Redis client: {}", e))
            })?;
            return Self::from_client(client).await;
        }

        let client = ClusterClient::new(nodes).map_err(|e| {
            SessionError::Configuration(format!("Failed to create Redis cluster client: {}", e))
        })?;
        let conn = client.get_async_connection().await?;
        tracing::debug!("connected to redis cluster");
        Ok(Self {
            conn: Connection::Cluster(conn),
        })
    }

    /// Create a new Redis store from a connection string
    pub async fn from_url(url: &str) -> Result<Self, SessionError> {
        Self::connect(&[url], false).await
    }

    /// Create a new Redis store from an existing client
    pub async fn from_client(client: redis::Client) -> Result<Self, SessionError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection_manager(conn))
    }

    /// Create a new Redis store from an existing connection manager
    pub fn from_connection_manager(conn: ConnectionManager) -> Self {
        Self {
            conn: Connection::Single(conn),
        }
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, SessionError> {
        let value: T = match &self.conn {
            Connection::Single(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await?
            }
            Connection::Cluster(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await?
            }
        };
        Ok(value)
    }
}

fn parse_nodes<S: AsRef<str>>(urls: &[S], use_tls: bool) -> Result<Vec<ConnectionInfo>, SessionError> {
    if urls.is_empty() {
        return Err(SessionError::Configuration(
            "no redis endpoint configured".to_string(),
        ));
    }

    urls.iter()
        .map(|url| {
            let url = url.as_ref();
            let url = match url.strip_prefix("redis://") {
                Some(rest) if use_tls => format!("rediss://{}", rest),
                _ => url.to_string(),
            };
            url.as_str().into_connection_info().map_err(|e| {
                SessionError::Configuration(format!("Invalid Redis URL: {}", e))
            })
        })
        .collect()
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), SessionError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs);
        self.query::<()>(&cmd).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let data: Option<Vec<u8>> = self.query(&cmd).await?;
        // An empty value carries no session data
        Ok(data.filter(|d| !d.is_empty()))
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query::<i64>(&cmd).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<String, SessionError> {
        self.query(&redis::cmd("PING")).await
    }
}

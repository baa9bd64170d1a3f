//! # salvo-redis-session
//!
//! Server-side sessions for the Salvo web framework, kept in Redis.
//!
//! The client only ever holds a signed token naming its session; the session
//! values themselves are serialized, size-checked and stored remotely under a
//! TTL that the store enforces.
//!
//! ## Features
//!
//! - **Signed tokens**: HMAC-SHA256, bound to the session name, with key rotation
//! - **Pluggable serialization**: MessagePack (default) or JSON
//! - **Redis single node or cluster**, optionally over TLS
//! - **Bounded payloads**: oversized sessions are refused before any write
//! - **Flash messages**: read-once values for post/redirect/get flows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salvo::prelude::*;
//! use salvo_redis_session::{Keyring, RedisStore, SessionDepotExt, SessionEngine, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RedisStore::connect(&["redis://127.0.0.1:6379"], false).await.unwrap();
//!     let engine = SessionEngine::new(store, Keyring::new(["your-secret-key"])).await.unwrap();
//!
//!     let router = Router::new()
//!         .hoop(SessionHandler::new(engine, "session"))
//!         .get(index);
//!
//!     Server::new(TcpListener::new("127.0.0.1:5800").bind().await)
//!         .serve(router)
//!         .await;
//! }
//!
//! #[handler]
//! async fn index(depot: &mut Depot) -> String {
//!     let session = depot.session_mut().unwrap();
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1).unwrap();
//!     format!("Views: {}", views + 1)
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod serializer;
pub mod session;
pub mod store;
pub mod token;

pub use config::{SameSite, StoreConfig};
pub use engine::{SaveOutcome, SessionEngine};
pub use error::SessionError;
pub use handler::SessionHandler;
pub use serializer::{JsonSerializer, MsgPackSerializer, SessionSerializer};
pub use session::{Session, SessionKey, SessionOptions, SessionValues};
pub use store::{KeyValueStore, MemoryStore};
pub use token::{Keyring, SigningKey};

#[cfg(feature = "redis-store")]
pub use store::RedisStore;

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;

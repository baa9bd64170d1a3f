//! Backing key-value stores

mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::{KeyValueStore, PONG};

#[cfg(feature = "redis-store")]
mod redis_store;

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;

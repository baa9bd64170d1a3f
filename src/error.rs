//! Session error types

use thiserror::Error;

/// Boxed error produced by a store backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store could not be configured or reached at construction time
    #[error("session store configuration error: {0}")]
    Configuration(String),

    /// Any failure from the backing key-value store
    #[error("session store transport error: {0}")]
    Transport(#[source] BoxError),

    /// Malformed, forged or expired session token
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// The serialized session exceeds the configured maximum length
    #[error("session payload too large: {size} bytes exceeds the limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// The JSON serializer met a key that is not a string
    #[error("non-string session key cannot be serialized to JSON: {0}")]
    UnsupportedKeyType(String),

    /// The active serializer failed to encode or decode the payload
    #[error("session serialization error: {0}")]
    Serialization(String),
}

impl SessionError {
    /// Wrap a plain message as a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        let msg: String = msg.into();
        SessionError::Transport(msg.into())
    }

    /// Whether this error came from the backing store
    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Transport(Box::new(err))
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for SessionError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for SessionError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

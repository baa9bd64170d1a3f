//! Session persistence engine
//!
//! Ties a [`KeyValueStore`], a [`SessionSerializer`] and a [`Keyring`]
//! together. The engine keeps no per-request state, so one instance can be
//! shared by every request of an application.

use std::future::Future;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::SessionError;
use crate::serializer::{MsgPackSerializer, SessionSerializer};
use crate::session::{Session, SessionValues};
use crate::store::{KeyValueStore, PONG};
use crate::token::{generate_session_id, Keyring};

/// What the caller should do with the session cookie after a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Send this token back to the client
    Token(String),
    /// The session was deleted; expire the client's cookie
    Clear,
}

impl SaveOutcome {
    pub fn token(&self) -> Option<&str> {
        match self {
            SaveOutcome::Token(t) => Some(t),
            SaveOutcome::Clear => None,
        }
    }
}

/// Server-side session store on top of a key-value backend
pub struct SessionEngine<S: KeyValueStore> {
    store: Arc<S>,
    keyring: Keyring,
    serializer: Arc<dyn SessionSerializer>,
    config: StoreConfig,
}

impl<S: KeyValueStore> SessionEngine<S> {
    /// Create an engine with default settings
    ///
    /// - Key prefix: "session_"
    /// - Max length: 4096 bytes
    /// - Default TTL: 1200 seconds
    /// - Serializer: MessagePack
    pub async fn new(store: S, keyring: Keyring) -> Result<Self, SessionError> {
        Self::with_config(store, keyring, StoreConfig::default()).await
    }

    /// Create an engine and check that the store answers a ping.
    ///
    /// A ping that fails with a transport error fails construction. A reply
    /// other than `PONG` is logged and tolerated.
    pub async fn with_config(
        store: S,
        mut keyring: Keyring,
        config: StoreConfig,
    ) -> Result<Self, SessionError> {
        if keyring.is_empty() {
            return Err(SessionError::Configuration(
                "at least one signing key is required".to_string(),
            ));
        }
        keyring.set_max_age(config.session_expire);

        let engine = Self {
            store: Arc::new(store),
            keyring,
            serializer: Arc::new(MsgPackSerializer),
            config,
        };
        engine.ping().await?;
        Ok(engine)
    }

    /// Use `serializer` for new writes and reads
    pub fn with_serializer<T: SessionSerializer>(mut self, serializer: T) -> Self {
        self.set_serializer(serializer);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Limit serialized sessions to `len` bytes; 0 removes the limit.
    /// Negative values are ignored.
    pub fn set_max_length(&mut self, len: i64) {
        if let Ok(len) = usize::try_from(len) {
            self.config.max_length = len;
        }
    }

    pub fn set_key_prefix<P: Into<String>>(&mut self, prefix: P) {
        self.config.key_prefix = prefix.into();
    }

    pub fn set_serializer<T: SessionSerializer>(&mut self, serializer: T) {
        self.serializer = Arc::new(serializer);
    }

    /// Set the max age of new sessions, in the store and in the browser.
    ///
    /// The same value bounds the age of accepted tokens. To end a single
    /// session, set its own `options_mut().max_age` to -1 and save it instead.
    pub fn set_max_age(&mut self, secs: i64) {
        self.config.session_expire = secs;
        self.keyring.set_max_age(secs);
    }

    /// Set the TTL used for sessions whose max age is 0
    pub fn set_default_max_age(&mut self, secs: i64) {
        self.config.default_max_age = secs;
    }

    /// Check that the store is alive; `Ok(false)` means it answered with something other than PONG
    pub async fn ping(&self) -> Result<bool, SessionError> {
        let reply = self.call(self.store.ping()).await?;
        if reply == PONG {
            Ok(true)
        } else {
            tracing::warn!(reply = %reply, "session store answered ping with an unexpected reply");
            Ok(false)
        }
    }

    /// A fresh session carrying a copy of the default options
    pub fn new_session(&self, name: &str) -> Session {
        Session::new(name, self.config.session_options())
    }

    /// Load the session named `name` from a request token, or start a new one.
    ///
    /// A missing, forged or expired token and a token whose record is gone all
    /// yield an empty session with `is_new() == true`. Store and decode
    /// failures are returned as errors.
    pub async fn fetch_or_create(
        &self,
        token: Option<&str>,
        name: &str,
    ) -> Result<Session, SessionError> {
        let mut session = self.new_session(name);

        let Some(token) = token else {
            return Ok(session);
        };
        let id = match self.keyring.decode(name, token) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(session = name, error = %e, "ignoring session token");
                return Ok(session);
            }
        };

        session.set_id(id);
        let found = self.load(&mut session).await?;
        if !found {
            tracing::debug!(session = name, "no stored record for session token");
        }
        session.set_is_new(!found);
        Ok(session)
    }

    /// Write the session to the store and return the cookie action for the caller.
    ///
    /// A session with `max_age <= 0` is deleted instead. A payload over the
    /// configured maximum fails with [`SessionError::PayloadTooLarge`] before
    /// anything is written, and the session is left as it was.
    pub async fn persist(&self, session: &mut Session) -> Result<SaveOutcome, SessionError> {
        if session.options().max_age <= 0 {
            self.delete_record(session.id()).await?;
            return Ok(SaveOutcome::Clear);
        }

        let payload = self.serializer.serialize(session.values())?;
        let max = self.config.max_length;
        if max != 0 && payload.len() > max {
            return Err(SessionError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let ttl = self.effective_ttl(session.options().max_age);

        if session.id().is_empty() {
            session.set_id(generate_session_id());
        }

        let key = self.key(session.id());
        self.call(self.store.set_with_ttl(&key, &payload, ttl))
            .await?;
        tracing::debug!(session = session.name(), bytes = payload.len(), ttl, "session saved");

        let token = self.keyring.encode(session.name(), session.id())?;
        Ok(SaveOutcome::Token(token))
    }

    /// Delete the session's record and empty its values.
    ///
    /// The values are cleared even if the store call fails.
    pub async fn remove(&self, session: &mut Session) -> Result<(), SessionError> {
        session.clear();
        self.delete_record(session.id()).await
    }

    /// Store TTL for a session max age: the age itself, or the default TTL for 0
    pub fn effective_ttl(&self, max_age: i64) -> u64 {
        let age = match max_age {
            0 => self.config.default_max_age,
            age => age,
        };
        age.max(1).unsigned_abs()
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    async fn load(&self, session: &mut Session) -> Result<bool, SessionError> {
        let key = self.key(session.id());
        let Some(data) = self.call(self.store.get(&key)).await? else {
            return Ok(false);
        };

        let mut values = SessionValues::new();
        self.serializer.deserialize(&data, &mut values)?;
        session.load_values(values);
        Ok(true)
    }

    async fn delete_record(&self, id: &str) -> Result<(), SessionError> {
        // Never saved, nothing to delete
        if id.is_empty() {
            return Ok(());
        }
        let key = self.key(id);
        self.call(self.store.delete(&key)).await
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        match self.config.command_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                SessionError::transport(format!("session store call timed out after {:?}", limit))
            })?,
            None => fut.await,
        }
    }
}

impl<S: KeyValueStore> Clone for SessionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keyring: self.keyring.clone(),
            serializer: Arc::clone(&self.serializer),
            config: self.config.clone(),
        }
    }
}

impl<S: KeyValueStore> std::fmt::Debug for SessionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("config", &self.config)
            .field("keyring", &self.keyring)
            .finish()
    }
}

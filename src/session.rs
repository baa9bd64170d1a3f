//! Session data structures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::config::SameSite;
use crate::error::SessionError;

/// Key under which flash messages are kept unless another key is given
pub const FLASH_KEY: &str = "_flash";

/// Key of a session value.
///
/// Only [`SessionKey::Text`] keys can be written by the JSON serializer;
/// the MessagePack serializer accepts both variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionKey {
    Text(String),
    Int(i64),
}

impl SessionKey {
    /// The key as a string slice, if it is textual
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionKey::Text(s) => Some(s),
            SessionKey::Int(_) => None,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Text(s) => f.write_str(s),
            SessionKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        SessionKey::Text(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        SessionKey::Text(s)
    }
}

impl From<i64> for SessionKey {
    fn from(i: i64) -> Self {
        SessionKey::Int(i)
    }
}

/// The values mapping carried by a session
pub type SessionValues = HashMap<SessionKey, Value>;

/// Per-session cookie and lifetime options
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Cookie path
    pub path: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Lifetime in seconds.
    /// `0` uses the store's default TTL, a negative value deletes the session on save.
    pub max_age: i64,

    /// Secure flag
    pub secure: bool,

    /// HttpOnly flag
    pub http_only: bool,

    /// SameSite attribute
    pub same_site: Option<SameSite>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: crate::config::SESSION_EXPIRE,
            secure: false,
            http_only: true,
            same_site: None,
        }
    }
}

/// A named session for a single request.
///
/// The ID stays empty until the session is saved for the first time.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    id: String,
    values: SessionValues,
    options: SessionOptions,
    is_new: bool,
    modified: bool,
    destroyed: bool,
}

impl Session {
    /// Create a new, empty session
    pub fn new<S: Into<String>>(name: S, options: SessionOptions) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            values: SessionValues::new(),
            options,
            is_new: true,
            modified: false,
            destroyed: false,
        }
    }

    /// Name of the session (also the cookie name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Check if this is a new session
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn set_is_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// Check if the session has been modified
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Check if the session should be destroyed
    pub fn should_destroy(&self) -> bool {
        self.destroyed
    }

    /// Session options
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Mutable session options; setting `max_age` below 1 deletes the session on save
    pub fn options_mut(&mut self) -> &mut SessionOptions {
        self.modified = true;
        &mut self.options
    }

    /// Raw session values
    pub fn values(&self) -> &SessionValues {
        &self.values
    }

    pub(crate) fn load_values(&mut self, values: SessionValues) {
        self.values.extend(values);
    }

    /// Mutable raw session values
    pub fn values_mut(&mut self) -> &mut SessionValues {
        self.modified = true;
        &mut self.values
    }

    /// Get a value from the session
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: impl Into<SessionKey>) -> Option<T> {
        self.values
            .get(&key.into())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session
    pub fn set<K: Into<SessionKey>, T: Serialize>(
        &mut self,
        key: K,
        value: T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.into(), value);
        self.modified = true;
        Ok(())
    }

    /// Remove a value from the session
    pub fn remove<K: Into<SessionKey>>(&mut self, key: K) -> Option<Value> {
        let result = self.values.remove(&key.into());
        if result.is_some() {
            self.modified = true;
        }
        result
    }

    /// Check if a key exists in the session
    pub fn contains<K: Into<SessionKey>>(&self, key: K) -> bool {
        self.values.contains_key(&key.into())
    }

    /// Clear all session data
    pub fn clear(&mut self) {
        self.values.clear();
        self.modified = true;
    }

    /// Check if the session is empty (no user data)
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mark the session for destruction
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    /// Append a flash message under the default key
    pub fn add_flash<T: Serialize>(&mut self, value: T) -> Result<(), SessionError> {
        self.add_flash_to(FLASH_KEY, value)
    }

    /// Append a flash message under `key`
    pub fn add_flash_to<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let entry = self
            .values
            .entry(SessionKey::from(key))
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
        self.modified = true;
        Ok(())
    }

    /// Take all flash messages under the default key
    pub fn flashes(&mut self) -> Vec<Value> {
        self.flashes_from(FLASH_KEY)
    }

    /// Take all flash messages under `key`, removing them from the session
    pub fn flashes_from(&mut self, key: &str) -> Vec<Value> {
        match self.remove(key) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("sid", SessionOptions::default());
        assert_eq!(session.name(), "sid");
        assert!(session.id().is_empty());
        assert!(session.is_new());
        assert!(session.is_empty());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_typed_get_set() {
        let mut session = Session::new("sid", SessionOptions::default());
        session.set("views", 3).unwrap();
        session.set(7i64, "seven").unwrap();

        assert_eq!(session.get::<i32>("views"), Some(3));
        assert_eq!(session.get::<String>("missing"), None);
        assert!(session.contains(7i64));
        assert_eq!(session.get::<String>(7i64), Some("seven".to_string()));
        assert_eq!(session.get::<String>(8i64), None);
        assert!(session.is_modified());
    }

    #[test]
    fn test_flashes_are_read_once() {
        let mut session = Session::new("sid", SessionOptions::default());
        assert!(session.flashes().is_empty());

        session.add_flash("foo").unwrap();
        session.add_flash("bar").unwrap();
        session.add_flash_to("custom_key", "baz").unwrap();

        assert_eq!(session.flashes(), vec![json!("foo"), json!("bar")]);
        assert!(session.flashes().is_empty());
        assert_eq!(session.flashes_from("custom_key"), vec![json!("baz")]);
        assert!(session.flashes_from("custom_key").is_empty());
    }

    #[test]
    fn test_session_key_display() {
        assert_eq!(SessionKey::from("a").to_string(), "a");
        assert_eq!(SessionKey::from(42i64).to_string(), "42");
        assert_eq!(SessionKey::from(42i64).as_str(), None);
    }
}

//! Store configuration

use std::time::Duration;

use crate::session::SessionOptions;

/// Default TTL (seconds) for sessions whose `max_age` is 0: 20 minutes
pub const DEFAULT_MAX_AGE: i64 = 60 * 20;

/// Default `max_age` (seconds) written into new session options: 30 days
pub const SESSION_EXPIRE: i64 = 86400 * 30;

/// Default upper bound for a serialized session, in bytes
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Default key prefix in the backing store
pub const DEFAULT_KEY_PREFIX: &str = "session_";

/// Configuration for a [`SessionEngine`](crate::SessionEngine)
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Prefix prepended to every session ID to form the store key (default: "session_")
    pub key_prefix: String,

    /// Maximum serialized payload size in bytes; 0 disables the check (default: 4096)
    pub max_length: usize,

    /// TTL in seconds applied when a session's own max age is 0 (default: 1200)
    pub default_max_age: i64,

    /// Max age in seconds written into newly created session options (default: 30 days)
    pub session_expire: i64,

    /// Deadline for every store round trip (default: None = wait indefinitely)
    pub command_timeout: Option<Duration>,

    /// Cookie path (default: "/")
    pub cookie_path: String,

    /// Cookie domain (default: None - current domain only)
    pub cookie_domain: Option<String>,

    /// Secure flag for cookie (default: false)
    pub cookie_secure: bool,

    /// HttpOnly flag for cookie (default: true)
    pub cookie_http_only: bool,

    /// SameSite attribute for cookie (default: None - attribute omitted)
    pub cookie_same_site: Option<SameSite>,
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            default_max_age: DEFAULT_MAX_AGE,
            session_expire: SESSION_EXPIRE,
            command_timeout: None,
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: None,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key prefix in the store (default: "session_")
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the maximum serialized payload length; 0 means unlimited
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the TTL used for sessions with a max age of 0
    pub fn with_default_max_age(mut self, secs: i64) -> Self {
        self.default_max_age = secs;
        self
    }

    /// Set the max age written into new session options
    pub fn with_session_expire(mut self, secs: i64) -> Self {
        self.session_expire = secs;
        self
    }

    /// Bound every store call by the given deadline
    pub fn with_command_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.command_timeout = timeout.into();
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_cookie_path<S: Into<String>>(mut self, path: S) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_cookie_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set the SameSite attribute
    pub fn with_same_site(mut self, same_site: impl Into<Option<SameSite>>) -> Self {
        self.cookie_same_site = same_site.into();
        self
    }

    /// Fresh options for a newly created session
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            path: self.cookie_path.clone(),
            domain: self.cookie_domain.clone(),
            max_age: self.session_expire,
            secure: self.cookie_secure,
            http_only: self.cookie_http_only,
            same_site: self.cookie_same_site,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.key_prefix, "session_");
        assert_eq!(config.max_length, 4096);
        assert_eq!(config.default_max_age, 1200);
        assert_eq!(config.session_expire, 2_592_000);
        assert!(config.command_timeout.is_none());
    }

    #[test]
    fn test_session_options_follow_config() {
        let config = StoreConfig::new()
            .with_session_expire(60)
            .with_cookie_path("/app")
            .with_secure(true)
            .with_same_site(SameSite::Strict);

        let options = config.session_options();
        assert_eq!(options.max_age, 60);
        assert_eq!(options.path, "/app");
        assert!(options.secure);
        assert!(options.http_only);
        assert_eq!(options.same_site, Some(SameSite::Strict));
    }
}

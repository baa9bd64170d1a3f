//! Session identifiers and authenticated session tokens
//!
//! A token carries the session ID to the client. Its format is
//! `base64url(timestamp "|" base64url(value) "|" base64url(mac))`, where the
//! MAC is HMAC-SHA256 over `name "|" timestamp "|" base64url(value)`. Binding
//! the session name into the MAC stops a token minted for one cookie from being
//! replayed under another.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;

use crate::config::SESSION_EXPIRE;
use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a session identifier
pub const IDENTIFIER_LEN: usize = 32;

/// Tokens longer than this are rejected before any MAC work
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Tolerated clock drift between the servers sharing a keyring, in seconds
const CLOCK_SKEW: i64 = 60;

/// Fresh random bytes for a session identifier
pub fn generate_identifier() -> [u8; IDENTIFIER_LEN] {
    let mut bytes = [0u8; IDENTIFIER_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A new session ID: 32 random bytes, base32 without padding
pub fn generate_session_id() -> String {
    BASE32_NOPAD.encode(&generate_identifier())
}

/// Secret used to authenticate tokens
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// A random 64 byte key
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; 64];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        match HmacSha256::new_from_slice(&self.0) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC can take key of any size"),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl From<&str> for SigningKey {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for SigningKey {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<&[u8]> for SigningKey {
    fn from(b: &[u8]) -> Self {
        Self::new(b)
    }
}

impl From<Vec<u8>> for SigningKey {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

/// Ordered list of signing keys.
///
/// The first key signs new tokens. Every key is tried in order when
/// verifying, so older keys can stay around during rotation.
#[derive(Clone, Debug)]
pub struct Keyring {
    keys: Vec<SigningKey>,
    max_age: i64,
}

impl Keyring {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SigningKey>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            max_age: SESSION_EXPIRE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Maximum token age in seconds; 0 disables the check
    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn set_max_age(&mut self, secs: i64) {
        self.max_age = secs;
    }

    /// Produce a token for `value` bound to `name`
    pub fn encode(&self, name: &str, value: &str) -> Result<String, SessionError> {
        self.encode_at(name, value, chrono::Utc::now().timestamp())
    }

    fn encode_at(&self, name: &str, value: &str, timestamp: i64) -> Result<String, SessionError> {
        let key = self
            .keys
            .first()
            .ok_or_else(|| SessionError::Configuration("keyring has no signing keys".into()))?;

        let encoded_value = URL_SAFE_NO_PAD.encode(value.as_bytes());
        let mut mac = key.mac();
        mac.update(signed_input(name, timestamp, &encoded_value).as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let token = URL_SAFE_NO_PAD.encode(format!("{}|{}|{}", timestamp, encoded_value, signature));
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(SessionError::InvalidToken("encoded value is too long".into()));
        }
        Ok(token)
    }

    /// Verify `token` for `name` and recover its value
    pub fn decode(&self, name: &str, token: &str) -> Result<String, SessionError> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(invalid("token is too long"));
        }
        if self.keys.is_empty() {
            return Err(SessionError::Configuration("keyring has no signing keys".into()));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| invalid("token is not base64"))?;
        let raw = String::from_utf8(raw).map_err(|_| invalid("token is not utf-8"))?;

        let mut parts = raw.splitn(3, '|');
        let (timestamp, encoded_value, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(v), Some(s)) => (t, v, s),
            _ => return Err(invalid("token is malformed")),
        };
        let timestamp: i64 = timestamp.parse().map_err(|_| invalid("bad timestamp"))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature.as_bytes())
            .map_err(|_| invalid("bad signature encoding"))?;

        let input = signed_input(name, timestamp, encoded_value);
        let verified = self.keys.iter().any(|key| {
            let mut mac = key.mac();
            mac.update(input.as_bytes());
            mac.verify_slice(&signature).is_ok()
        });
        if !verified {
            return Err(invalid("signature mismatch"));
        }

        let now = chrono::Utc::now().timestamp();
        if timestamp > now + CLOCK_SKEW {
            return Err(invalid("timestamp is in the future"));
        }
        if self.max_age != 0 && timestamp < now.saturating_sub(self.max_age) {
            return Err(invalid("token has expired"));
        }

        let value = URL_SAFE_NO_PAD
            .decode(encoded_value.as_bytes())
            .map_err(|_| invalid("bad value encoding"))?;
        String::from_utf8(value).map_err(|_| invalid("value is not utf-8"))
    }
}

fn signed_input(name: &str, timestamp: i64, encoded_value: &str) -> String {
    format!("{}|{}|{}", name, timestamp, encoded_value)
}

fn invalid(msg: &str) -> SessionError {
    SessionError::InvalidToken(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        // ceil(32 * 8 / 5)
        assert_eq!(id.len(), 52);
        assert!(!id.contains('='));
        assert!(id
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_session_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_encode_and_decode() {
        let keyring = Keyring::new(["secret-key"]);
        let token = keyring.encode("my session", "session-id").unwrap();
        assert_eq!(keyring.decode("my session", &token).unwrap(), "session-id");
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let token = Keyring::new(["secret-key"]).encode("sid", "value").unwrap();
        let err = Keyring::new(["other-key"]).decode("sid", &token).unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken(_)));
    }

    #[test]
    fn test_name_is_bound() {
        let keyring = Keyring::new(["secret-key"]);
        let token = keyring.encode("sid", "value").unwrap();
        assert!(keyring.decode("other", &token).is_err());
    }

    #[test]
    fn test_key_rotation() {
        let old = Keyring::new(["old-secret"]);
        let token = old.encode("sid", "value").unwrap();

        let rotated = Keyring::new(["new-secret", "old-secret"]);
        assert_eq!(rotated.decode("sid", &token).unwrap(), "value");

        // New tokens are signed with the first key only
        let fresh = rotated.encode("sid", "value").unwrap();
        assert!(old.decode("sid", &fresh).is_err());
        assert!(Keyring::new(["new-secret"]).decode("sid", &fresh).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let mut keyring = Keyring::new(["secret-key"]);
        keyring.set_max_age(60);
        let now = chrono::Utc::now().timestamp();

        let stale = keyring.encode_at("sid", "value", now - 120).unwrap();
        assert!(keyring.decode("sid", &stale).is_err());

        keyring.set_max_age(0);
        assert_eq!(keyring.decode("sid", &stale).unwrap(), "value");
    }

    #[test]
    fn test_extreme_max_age() {
        let mut keyring = Keyring::new(["secret-key"]);
        let token = keyring.encode("sid", "value").unwrap();

        keyring.set_max_age(i64::MIN);
        assert!(keyring.decode("sid", &token).is_err());

        keyring.set_max_age(i64::MAX);
        assert_eq!(keyring.decode("sid", &token).unwrap(), "value");
    }

    #[test]
    fn test_future_token() {
        let keyring = Keyring::new(["secret-key"]);
        let now = chrono::Utc::now().timestamp();
        let token = keyring.encode_at("sid", "value", now + 3600).unwrap();
        assert!(keyring.decode("sid", &token).is_err());
    }

    #[test]
    fn test_garbage_and_oversized_tokens() {
        let keyring = Keyring::new(["secret-key"]);
        assert!(keyring.decode("sid", "").is_err());
        assert!(keyring.decode("sid", "not a token!").is_err());
        assert!(keyring.decode("sid", &"A".repeat(MAX_TOKEN_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_empty_keyring() {
        let keyring = Keyring::new(Vec::<SigningKey>::new());
        assert!(matches!(
            keyring.encode("sid", "value"),
            Err(SessionError::Configuration(_))
        ));
    }
}

//! Fluent builders for creating test objects

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};

use super::constants::{TEST_NOW_SECONDS, TEST_SUBJECT, TEST_USERNAME};

/// Builder for unsigned JWT-shaped tokens
///
/// The signature segment is a fixed placeholder; the client never verifies it.
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTokenBuilder {
    /// Token for the default test subject, valid for one hour after the fixture clock
    #[must_use]
    pub fn new() -> Self {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from(TEST_SUBJECT));
        claims.insert("username".to_string(), Value::from(TEST_USERNAME));
        claims.insert("iat".to_string(), Value::from(TEST_NOW_SECONDS));
        claims.insert("exp".to_string(), Value::from(TEST_NOW_SECONDS + 3600));
        Self { claims }
    }

    #[must_use]
    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", Value::from(sub))
    }

    #[must_use]
    pub fn username(self, username: &str) -> Self {
        self.claim("username", Value::from(username))
    }

    #[must_use]
    pub fn expires_at(self, at: DateTime<Utc>) -> Self {
        self.claim("exp", Value::from(at.timestamp()))
    }

    /// Expire relative to the fixture clock
    #[must_use]
    pub fn expires_in(self, delta: TimeDelta) -> Self {
        self.claim("exp", Value::from(TEST_NOW_SECONDS + delta.num_seconds()))
    }

    #[must_use]
    pub fn expired(self) -> Self {
        self.expires_in(-TimeDelta::hours(1))
    }

    #[must_use]
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = general_purpose::URL_SAFE_NO_PAD.encode(Value::Object(self.claims).to_string());
        format!("{header}.{payload}.signature")
    }
}

//! Bearer token decoding
//!
//! Tokens are treated as opaque credentials issued by the backend. The client
//! never verifies signatures; it only peeks at the payload to learn when the
//! token expires and whom it was issued to. Every check here fails closed: a
//! token that cannot be decoded is considered expired and anonymous.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::utils::crypto::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid JWT format")]
    Format,
    #[error("Token payload encoding error: {0}")]
    Encoding(String),
    #[error("Token claims error: {0}")]
    Claims(String),
}

/// Claims read from a token payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Expiry, unix seconds
    pub exp: i64,
    pub sub: Option<String>,
    pub iat: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl TokenClaims {
    fn from_payload(payload: &Value) -> Result<Self, TokenError> {
        let exp = payload
            .get("exp")
            .and_then(numeric_seconds)
            .ok_or_else(|| TokenError::Claims("missing numeric exp claim".to_string()))?;

        Ok(Self {
            exp,
            sub: payload.get("sub").and_then(string_like),
            iat: payload.get("iat").and_then(numeric_seconds),
            username: payload.get("username").and_then(string_like),
            email: payload.get("email").and_then(string_like),
        })
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Expired once `exp`, in milliseconds, is at or before `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.saturating_mul(1000) <= now.timestamp_millis()
    }

    /// Stable identity of the token holder: `sub`, else `username`, else `email`
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .filter(|id| !id.is_empty())
    }
}

fn numeric_seconds(value: &Value) -> Option<i64> {
    #[allow(clippy::cast_possible_truncation)]
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

fn string_like(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stateless JWT payload reader
pub struct TokenCodec;

impl TokenCodec {
    /// Decode the payload segment of a JWT without verifying it
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not have three segments or the
    /// payload is not base64-encoded JSON.
    pub fn decode_payload(token: &str) -> Result<Value, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::Format);
        }

        let payload_b64 = parts[1];
        let payload_bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .or_else(|_| general_purpose::STANDARD.decode(payload_b64))
            .map_err(|e| TokenError::Encoding(format!("Base64 decode failed: {e}")))?;

        let payload_str = String::from_utf8(payload_bytes)
            .map_err(|_| TokenError::Encoding("UTF-8 decode failed".to_string()))?;

        serde_json::from_str(&payload_str)
            .map_err(|e| TokenError::Encoding(format!("JSON parse failed: {e}")))
    }

    /// Decode the claims of a token
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded or carries no numeric `exp`.
    pub fn decode(token: &str) -> Result<TokenClaims, TokenError> {
        let payload = Self::decode_payload(token)?;
        TokenClaims::from_payload(&payload)
    }

    /// Whether the token is unusable at `now`; undecodable tokens count as expired
    #[must_use]
    pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
        Self::decode(token).map_or(true, |claims| claims.is_expired_at(now))
    }

    #[must_use]
    pub fn identity(token: &str) -> Option<String> {
        Self::decode(token)
            .ok()
            .and_then(|claims| claims.identity().map(str::to_string))
    }

    /// Lower-case hex SHA-256 of an identity
    #[must_use]
    pub fn fingerprint(identity: &str) -> String {
        sha256_hex(identity)
    }

    /// Fingerprint of the identity carried by `token`, if any
    #[must_use]
    pub fn owner_fingerprint(token: &str) -> Option<String> {
        Self::identity(token).map(|id| Self::fingerprint(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(payload: &Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_decode_reads_claims() {
        let token = token_with(&json!({
            "exp": 1_800_000_000,
            "sub": "42",
            "iat": 1_700_000_000,
            "username": "goatmaster",
        }));
        let claims = TokenCodec::decode(&token).unwrap();
        assert_eq!(claims.exp, 1_800_000_000);
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert_eq!(claims.identity(), Some("42"));
    }

    #[test]
    fn test_numeric_subject_and_fractional_exp() {
        let token = token_with(&json!({ "exp": 1_800_000_000.75, "sub": 7 }));
        let claims = TokenCodec::decode(&token).unwrap();
        assert_eq!(claims.exp, 1_800_000_000);
        assert_eq!(claims.sub.as_deref(), Some("7"));
    }

    #[test]
    fn test_identity_falls_back_to_username_then_email() {
        let by_name = token_with(&json!({ "exp": 1, "username": "goat" }));
        assert_eq!(TokenCodec::identity(&by_name).as_deref(), Some("goat"));

        let by_email = token_with(&json!({ "exp": 1, "email": "g@example.com" }));
        assert_eq!(TokenCodec::identity(&by_email).as_deref(), Some("g@example.com"));

        let anonymous = token_with(&json!({ "exp": 1 }));
        assert_eq!(TokenCodec::identity(&anonymous), None);
        assert_eq!(TokenCodec::owner_fingerprint(&anonymous), None);
    }

    #[test]
    fn test_padded_standard_payload_is_accepted() {
        let body = general_purpose::STANDARD.encode(json!({ "exp": 10 }).to_string());
        let token = format!("h.{body}.s");
        assert_eq!(TokenCodec::decode(&token).unwrap().exp, 10);
    }

    #[test]
    fn test_malformed_tokens_fail_closed() {
        let now = at(0);
        for token in ["", "abc", "a.b", "a.b.c.d", "a.!!!.c", "h.bm90LWpzb24.s"] {
            assert!(TokenCodec::decode(token).is_err(), "{token:?} should not decode");
            assert!(TokenCodec::is_expired(token, now), "{token:?} should be expired");
        }
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = token_with(&json!({ "sub": "1" }));
        assert!(matches!(TokenCodec::decode(&token), Err(TokenError::Claims(_))));
        assert!(TokenCodec::is_expired(&token, at(0)));

        let textual = token_with(&json!({ "exp": "soon" }));
        assert!(TokenCodec::is_expired(&textual, at(0)));
    }

    #[test]
    fn test_expiry_boundary() {
        let token = token_with(&json!({ "exp": 1000 }));
        assert!(!TokenCodec::is_expired(&token, at(999)));
        assert!(TokenCodec::is_expired(&token, at(1000)));
        assert!(TokenCodec::is_expired(&token, at(1001)));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = TokenCodec::fingerprint("42");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(fp, TokenCodec::fingerprint("43"));
    }
}

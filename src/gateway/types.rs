use std::fmt;

use reqwest::Method;
use serde_json::Value;

/// Backend endpoint paths
pub mod endpoints {
    pub const LOGIN: &str = "/api/login";
    pub const REGISTER: &str = "/api/register";
    pub const VERIFY_EMAIL: &str = "/api/verify-email";
    pub const REFRESH_TOKEN: &str = "/api/refresh-token";
    pub const USER_PROFILE: &str = "/api/user-profile";
    pub const COMPLETE_PROFILE: &str = "/api/complete_profile";
    pub const LOGIN_HISTORY: &str = "/api/login-history";
    pub const HEALTH: &str = "/health";
}

pub const CONTENT_TYPE_JSON: (&str, &str) = ("Content-Type", "application/json");

/// Gateway failures; an HTTP error status is not one of these
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Outgoing request description
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Headers to put on the wire
    ///
    /// Starts from the JSON content type, adds the bearer credential, then
    /// applies caller headers. Names compare case-insensitively and the
    /// caller's value wins.
    #[must_use]
    pub fn effective_headers(&self) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> =
            vec![(CONTENT_TYPE_JSON.0.to_string(), CONTENT_TYPE_JSON.1.to_string())];
        if let Some(token) = &self.bearer {
            merged.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        for (name, value) in &self.headers {
            if let Some(existing) = merged
                .iter_mut()
                .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            {
                existing.1.clone_from(value);
            } else {
                merged.push((name.clone(), value.clone()));
            }
        }
        merged
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers.len())
            .field("has_body", &self.body.is_some())
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// How a response should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    Unauthorized,
    Rejected(u16),
}

/// Parsed backend response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    #[must_use]
    pub fn classify(&self) -> ResponseClass {
        match self.status {
            200..=299 => ResponseClass::Success,
            401 => ResponseClass::Unauthorized,
            other => ResponseClass::Rejected(other),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.classify() == ResponseClass::Success
    }

    /// A top-level string field of the body, if present and non-empty
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

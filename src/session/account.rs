//! Account flows around the session: registration, e-mail verification,
//! profile completion and login history.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::errors::SessionError;
use super::manager::SessionManager;
use crate::gateway::{endpoints, ApiRequest, GatewayError, ResponseClass};
use crate::storage::keys;
use crate::utils::validation::{is_valid_email, normalize_email};

const VERIFICATION_SENT_MARKER: &str = "Verification code";
const EMAIL_VERIFIED_MESSAGE: &str = "Email verified";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

/// Details collected after e-mail verification; the e-mail itself comes from the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileCompletion {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRecord {
    pub ip_address: String,
    pub login_time: String,
}

impl SessionManager {
    /// Create an account and trigger the verification e-mail
    ///
    /// Returns whether the backend confirmed that a verification code was sent.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed e-mail or empty password, and
    /// propagates transport and storage failures.
    pub async fn register(&self, request: &RegisterRequest) -> Result<bool, SessionError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(SessionError::Validation("a valid email address is required".into()));
        }
        if request.password.is_empty() {
            return Err(SessionError::Validation("password must not be empty".into()));
        }

        let payload = RegisterRequest {
            email: email.clone(),
            ..request.clone()
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| SessionError::Validation(format!("unencodable registration: {e}")))?;
        let response = self
            .gateway()
            .send(ApiRequest::post(endpoints::REGISTER).with_json(body))
            .await?;

        if !response.is_success() {
            info!("Registration refused (status {})", response.status);
            return Ok(false);
        }

        self.store()
            .multi_set(&[
                (keys::USERNAME, request.username.clone()),
                (keys::EMAIL, email),
            ])
            .await?;

        let code_sent = response
            .str_field("message")
            .is_some_and(|m| m.contains(VERIFICATION_SENT_MARKER));
        info!("📨 Registered {} (verification sent: {code_sent})", request.username);
        Ok(code_sent)
    }

    /// Confirm an e-mail address with the code the backend sent
    ///
    /// # Errors
    ///
    /// Propagates transport and storage failures.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<bool, SessionError> {
        let email = normalize_email(email);
        let response = self
            .gateway()
            .send(ApiRequest::post(endpoints::VERIFY_EMAIL).with_json(json!({
                "email": email,
                "verification_code": code.trim(),
            })))
            .await?;

        if response.is_success() && response.str_field("message") == Some(EMAIL_VERIFIED_MESSAGE) {
            self.store().set(keys::EMAIL, &email).await?;
            info!("✅ Email verified");
            return Ok(true);
        }

        warn!(
            "Verification failed (status {}): {}",
            response.status,
            response.str_field("message").unwrap_or("no message")
        );
        Ok(false)
    }

    /// Submit the remaining profile details for the verified e-mail
    ///
    /// Returns `false` without a network call when no verified e-mail is stored.
    ///
    /// # Errors
    ///
    /// Propagates transport and storage failures.
    pub async fn complete_profile(&self, details: &ProfileCompletion) -> Result<bool, SessionError> {
        let Some(email) = self
            .store()
            .get(keys::EMAIL)
            .await?
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty())
        else {
            warn!("No verified email stored; cannot complete profile");
            return Ok(false);
        };

        let mut body = serde_json::to_value(details)
            .map_err(|e| SessionError::Validation(format!("unencodable profile: {e}")))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("email".to_string(), Value::String(email));
        }

        let response = self
            .gateway()
            .send(ApiRequest::post(endpoints::COMPLETE_PROFILE).with_json(body))
            .await?;
        if !response.is_success() {
            warn!("Profile completion failed (status {})", response.status);
            return Ok(false);
        }

        // Cached profile predates the new details
        self.profile_cache().clear().await?;
        Ok(true)
    }

    /// Recent sign-ins of the current account
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a token or when the backend refuses
    /// it, `Rejected` for other error statuses, and propagates transport and
    /// parse failures.
    pub async fn login_history(&self) -> Result<Vec<LoginRecord>, SessionError> {
        let Some(token) = self.token_or_rehydrate().await? else {
            return Err(SessionError::NotAuthenticated);
        };

        let response = self
            .gateway()
            .send(ApiRequest::get(endpoints::LOGIN_HISTORY).with_bearer(token))
            .await?;

        match response.classify() {
            ResponseClass::Success => {}
            ResponseClass::Unauthorized => return Err(SessionError::NotAuthenticated),
            ResponseClass::Rejected(status) => {
                return Err(SessionError::Rejected {
                    endpoint: endpoints::LOGIN_HISTORY.to_string(),
                    status,
                })
            }
        }

        let history: Vec<LoginRecord> = match response.data.get("history") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                GatewayError::MalformedResponse(format!(
                    "{}: {e}",
                    endpoints::LOGIN_HISTORY
                ))
            })?,
        };
        debug!("Fetched {} login records", history.len());
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::profile::ProfileCache;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::testing::{MockClock, MockGateway, RecordingNavigator, TestFixtures, TEST_EMAIL};

    fn setup() -> (Arc<MemoryStore>, Arc<MockGateway>, Arc<ProfileCache>, SessionManager) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::new());
        let clock = Arc::new(MockClock::new(TestFixtures::now()));
        let cache = Arc::new(ProfileCache::new(store.clone(), clock));
        let manager = SessionManager::new(
            store.clone(),
            gateway.clone(),
            Arc::new(RecordingNavigator::new()),
            cache.clone(),
        );
        (store, gateway, cache, manager)
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            email: "  NewGoat@Example.com ".to_string(),
            password: "hunter2".to_string(),
            username: "newgoat".to_string(),
            firstname: "New".to_string(),
            lastname: "Goat".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_persists_identity() {
        let (store, gateway, _, manager) = setup();
        gateway.respond(
            endpoints::REGISTER,
            201,
            json!({ "message": "Verification code sent to your email" }),
        );

        assert!(manager.register(&registration()).await.unwrap());
        assert_eq!(
            store.get(keys::EMAIL).await.unwrap().as_deref(),
            Some("newgoat@example.com")
        );
        assert_eq!(store.get(keys::USERNAME).await.unwrap().as_deref(), Some("newgoat"));
        assert_eq!(
            gateway.requests_to(endpoints::REGISTER)[0].body.as_ref().unwrap()["email"],
            "newgoat@example.com"
        );
    }

    #[tokio::test]
    async fn test_register_without_code_message() {
        let (_, gateway, _, manager) = setup();
        gateway.respond(endpoints::REGISTER, 200, json!({ "message": "Welcome" }));
        assert!(!manager.register(&registration()).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let (store, gateway, _, manager) = setup();
        let mut bad = registration();
        bad.email = "nope".to_string();
        assert!(matches!(
            manager.register(&bad).await,
            Err(SessionError::Validation(_))
        ));

        gateway.respond(endpoints::REGISTER, 409, json!({ "message": "exists" }));
        assert!(!manager.register(&registration()).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_verify_email_requires_exact_message() {
        let (store, gateway, _, manager) = setup();
        gateway.respond(endpoints::VERIFY_EMAIL, 200, json!({ "message": "Invalid code" }));
        assert!(!manager.verify_email(TEST_EMAIL, "123456").await.unwrap());
        assert!(!store.contains_key(keys::EMAIL).await);

        gateway.respond(endpoints::VERIFY_EMAIL, 200, json!({ "message": "Email verified" }));
        assert!(manager.verify_email(" Goat@Example.com", "123456").await.unwrap());
        assert_eq!(store.get(keys::EMAIL).await.unwrap().as_deref(), Some(TEST_EMAIL));

        let sent = gateway.requests_to(endpoints::VERIFY_EMAIL);
        assert_eq!(sent[1].body.as_ref().unwrap()["verification_code"], "123456");
    }

    #[tokio::test]
    async fn test_complete_profile_uses_stored_email_and_clears_cache() {
        let (store, gateway, cache, manager) = setup();
        let details = ProfileCompletion {
            firstname: "Goat".to_string(),
            city: "Austin".to_string(),
            ..ProfileCompletion::default()
        };

        assert!(!manager.complete_profile(&details).await.unwrap());
        assert!(gateway.requests().is_empty());

        store.set(keys::EMAIL, TEST_EMAIL).await.unwrap();
        cache
            .put(&TestFixtures::profile(), Some("owner"))
            .await
            .unwrap();
        gateway.respond(endpoints::COMPLETE_PROFILE, 200, json!({ "message": "ok" }));

        assert!(manager.complete_profile(&details).await.unwrap());
        let body = gateway.requests_to(endpoints::COMPLETE_PROFILE)[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(body["email"], TEST_EMAIL);
        assert_eq!(body["city"], "Austin");
        assert!(cache.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_history() {
        let (store, gateway, _, manager) = setup();
        assert_eq!(
            manager.login_history().await,
            Err(SessionError::NotAuthenticated)
        );

        store.set(keys::TOKEN, "t").await.unwrap();
        gateway.respond(
            endpoints::LOGIN_HISTORY,
            200,
            json!({ "history": [{ "ip_address": "10.0.0.1", "login_time": "2026-01-01T00:00:00Z" }] }),
        );
        gateway.respond(endpoints::LOGIN_HISTORY, 200, json!({ "history": null }));
        gateway.respond(endpoints::LOGIN_HISTORY, 500, json!({}));
        gateway.respond(endpoints::LOGIN_HISTORY, 401, json!({}));
        gateway.respond(endpoints::LOGIN_HISTORY, 200, json!({ "history": "oops" }));

        let history = manager.login_history().await.unwrap();
        assert_eq!(history[0].ip_address, "10.0.0.1");
        assert!(manager.login_history().await.unwrap().is_empty());
        assert!(matches!(
            manager.login_history().await,
            Err(SessionError::Rejected { status: 500, .. })
        ));
        assert_eq!(
            manager.login_history().await,
            Err(SessionError::NotAuthenticated)
        );
        assert!(matches!(
            manager.login_history().await,
            Err(SessionError::Gateway(GatewayError::MalformedResponse(_)))
        ));
        assert_eq!(
            gateway.requests_to(endpoints::LOGIN_HISTORY)[0].bearer.as_deref(),
            Some("t")
        );
    }
}

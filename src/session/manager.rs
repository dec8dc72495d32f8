//! Session Manager - Credential Lifecycle
//!
//! The `SessionManager` is the single writer of the active session. It keeps
//! an in-memory [`Session`] that mirrors the durable copy in the
//! [`KeyValueStore`]: memory is authoritative once hydrated, and every change
//! is persisted before it becomes visible in memory.
//!
//! ## Organization
//!
//! 1. **Construction** - wiring of store, gateway, navigator and cache
//! 2. **Login** - credential exchange and session establishment
//! 3. **Logout** - voluntary and forced session teardown
//! 4. **Rehydration & Refresh** - reading back the store, rotating the token
//! 5. **Accessors** - read-only views for callers and render-gating

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::json;
use tokio::sync::{RwLock, RwLockReadGuard};

use super::errors::SessionError;
use super::navigation::{Navigator, Route};
use super::state::{Session, SessionState};
use crate::gateway::{endpoints, ApiRequest, HttpGateway, ResponseClass};
use crate::profile::ProfileCache;
use crate::storage::{keys, KeyValueStore};
use crate::token::TokenCodec;
use crate::utils::logging::LoggingHelper;
use crate::utils::validation::validate_login_input;

// =============================================================================
// Session Manager Structure
// =============================================================================

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn HttpGateway>,
    navigator: Arc<dyn Navigator>,
    profile_cache: Arc<ProfileCache>,
    session: RwLock<Session>,
}

// =============================================================================
// 1. Construction
// =============================================================================

impl SessionManager {
    /// Create a manager with an empty in-memory session
    ///
    /// Call [`SessionManager::refresh_auth`] to pick up a session persisted by
    /// an earlier run.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        gateway: Arc<dyn HttpGateway>,
        navigator: Arc<dyn Navigator>,
        profile_cache: Arc<ProfileCache>,
    ) -> Self {
        Self {
            store,
            gateway,
            navigator,
            profile_cache,
            session: RwLock::new(Session::default()),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn HttpGateway> {
        &self.gateway
    }

    pub(crate) fn profile_cache(&self) -> &Arc<ProfileCache> {
        &self.profile_cache
    }

    /// Hold off login, logout and refresh while the guard lives
    pub(crate) async fn pin_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().await
    }
}

// =============================================================================
// 2. Login
// =============================================================================

impl SessionManager {
    /// Exchange credentials for a session token
    ///
    /// Returns the token on success. Every failure (invalid input, transport,
    /// unparseable body, non-2xx status, missing `token` or `username`,
    /// storage) yields `None` and leaves both memory and the store untouched.
    pub async fn login(&self, email: &str, password: &str) -> Option<String> {
        let email = match validate_login_input(email, password) {
            Ok(email) => email,
            Err(reason) => {
                debug!("Login rejected locally: {reason}");
                return None;
            }
        };

        let request = ApiRequest::post(endpoints::LOGIN).with_json(json!({
            "email": email,
            "password": password,
        }));
        let response = match self.gateway.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Login request failed: {e}");
                return None;
            }
        };

        if response.classify() != ResponseClass::Success {
            info!("Login refused by backend (status {})", response.status);
            return None;
        }

        let (Some(token), Some(username)) =
            (response.str_field("token"), response.str_field("username"))
        else {
            warn!("Login response is missing token or username; discarding");
            return None;
        };
        let (token, username) = (token.to_string(), username.to_string());

        let mut session = self.session.write().await;
        if let Err(e) = self
            .store
            .multi_set(&[
                (keys::TOKEN, token.clone()),
                (keys::USERNAME, username.clone()),
            ])
            .await
        {
            warn!("Failed to persist new session: {e}");
            return None;
        }

        // A profile cached under another identity must never be served to this one
        let owner = TokenCodec::owner_fingerprint(&token);
        if let Err(e) = self.profile_cache.retain_for_owner(owner.as_deref()).await {
            warn!("Failed to reconcile profile cache with new identity: {e}");
        }

        *session = Session::new(Some(token.clone()), Some(username.clone()));
        drop(session);
        LoggingHelper::log_session_established(&username, &token);
        Some(token)
    }
}

// =============================================================================
// 3. Logout
// =============================================================================

impl SessionManager {
    /// End the session voluntarily and return to the landing screen
    ///
    /// Idempotent. Storage failures are logged, never raised.
    pub async fn logout(&self) {
        self.end_session("logout").await;
        self.navigator.navigate(Route::Root);
    }

    /// End the session after the backend refused the credentials
    pub async fn deauthenticate(&self) {
        self.end_session("credentials rejected").await;
        self.navigator.navigate(Route::Login);
    }

    async fn end_session(&self, reason: &str) {
        let mut session = self.session.write().await;
        if let Err(e) = self.store.multi_remove(keys::SESSION_KEYS).await {
            warn!("Failed to clear persisted session: {e}");
        }
        session.clear();
        drop(session);
        LoggingHelper::log_session_cleared(reason);
    }
}

// =============================================================================
// 4. Rehydration & Refresh
// =============================================================================

impl SessionManager {
    /// Overwrite the in-memory session with the persisted one
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read; memory is left unchanged.
    pub async fn refresh_auth(&self) -> Result<(), SessionError> {
        let mut session = self.session.write().await;
        let token = self.store.get(keys::TOKEN).await?;
        let username = self.store.get(keys::USERNAME).await?;
        debug!(
            "Rehydrated session from store (token present: {})",
            token.is_some()
        );
        *session = Session::new(token, username);
        Ok(())
    }

    /// Current token, rehydrating from the store when memory holds none
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn token_or_rehydrate(&self) -> Result<Option<String>, SessionError> {
        if let Some(token) = self.current_token().await {
            return Ok(Some(token));
        }
        self.refresh_auth().await?;
        Ok(self.current_token().await)
    }

    /// Trade the current token for a new one
    ///
    /// Returns `Ok(None)` when there is no token, the backend declines the
    /// refresh, or the session ended or changed while the request was in
    /// flight. The username is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an unparseable body, or when
    /// the new token cannot be persisted.
    pub async fn refresh_token(&self) -> Result<Option<String>, SessionError> {
        let Some(current) = self.token_or_rehydrate().await? else {
            debug!("No token to refresh");
            return Ok(None);
        };

        let response = self
            .gateway
            .send(ApiRequest::post(endpoints::REFRESH_TOKEN).with_bearer(current.as_str()))
            .await?;

        if !response.is_success() {
            info!("Token refresh declined (status {})", response.status);
            return Ok(None);
        }
        let Some(new_token) = response.str_field("token").map(str::to_string) else {
            warn!("Token refresh response carried no token");
            return Ok(None);
        };

        // Persist and mirror under the write lock so a logout cannot interleave
        let mut session = self.session.write().await;
        if session.token() != Some(current.as_str()) {
            info!("Session changed during token refresh; discarding new token");
            return Ok(None);
        }
        self.store.set(keys::TOKEN, &new_token).await?;
        session.set_token(new_token.clone());
        drop(session);

        LoggingHelper::log_token_rotated(&current, &new_token);
        Ok(Some(new_token))
    }
}

// =============================================================================
// 5. Accessors
// =============================================================================

impl SessionManager {
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    pub async fn state(&self) -> SessionState {
        self.session.read().await.state()
    }

    pub async fn current_token(&self) -> Option<String> {
        self.session.read().await.token().map(str::to_string)
    }

    pub async fn username(&self) -> Option<String> {
        self.session.read().await.username().map(str::to_string)
    }
}

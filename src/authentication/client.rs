//! `AuthClient` - the [`SessionService`] implementation
//!
//! Wires the session manager, the profile cache and the profile fetcher over
//! one store, one gateway and one clock. Cloning is cheap and every clone
//! shares the same session.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::TimeDelta;

use super::traits::SessionService;
use crate::clock::{Clock, SystemClock};
use crate::gateway::HttpGateway;
use crate::profile::{JewelryItem, ProfileCache, ProfileFetcher, ProfileRecord};
use crate::session::{
    LoginRecord, Navigator, NoopNavigator, ProfileCompletion, RegisterRequest, SessionError,
    SessionManager, SessionState,
};
use crate::storage::KeyValueStore;

#[derive(Clone)]
pub struct AuthClient {
    session: Arc<SessionManager>,
    cache: Arc<ProfileCache>,
    fetcher: Arc<ProfileFetcher>,
}

/// Builder for [`AuthClient`]; store and gateway are required
#[derive(Default)]
pub struct AuthClientBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    gateway: Option<Arc<dyn HttpGateway>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
    profile_ttl: Option<TimeDelta>,
}

impl AuthClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn HttpGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_profile_ttl(mut self, ttl: TimeDelta) -> Self {
        self.profile_ttl = Some(ttl);
        self
    }

    /// Assemble the client
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the gateway was not provided.
    pub fn build(self) -> anyhow::Result<AuthClient> {
        let store = self
            .store
            .ok_or_else(|| anyhow!("a key-value store is required"))?;
        let gateway = self
            .gateway
            .ok_or_else(|| anyhow!("an HTTP gateway is required"))?;
        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(navigator) => navigator,
            None => Arc::new(NoopNavigator),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let mut cache = ProfileCache::new(store.clone(), clock.clone());
        if let Some(ttl) = self.profile_ttl {
            cache = cache.with_ttl(ttl);
        }
        let cache = Arc::new(cache);

        let session = Arc::new(SessionManager::new(store, gateway, navigator, cache.clone()));
        let fetcher = Arc::new(ProfileFetcher::new(session.clone(), clock));

        Ok(AuthClient {
            session,
            cache,
            fetcher,
        })
    }
}

impl AuthClient {
    #[must_use]
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::new()
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn profile_cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    #[must_use]
    pub fn fetcher(&self) -> &Arc<ProfileFetcher> {
        &self.fetcher
    }

    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    /// # Errors
    ///
    /// See [`SessionManager::refresh_token`].
    pub async fn refresh_token(&self) -> Result<Option<String>, SessionError> {
        self.session.refresh_token().await
    }

    /// # Errors
    ///
    /// See [`SessionManager::register`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<bool, SessionError> {
        self.session.register(request).await
    }

    /// # Errors
    ///
    /// See [`SessionManager::verify_email`].
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<bool, SessionError> {
        self.session.verify_email(email, code).await
    }

    /// # Errors
    ///
    /// See [`SessionManager::complete_profile`].
    pub async fn complete_profile(&self, details: &ProfileCompletion) -> Result<bool, SessionError> {
        self.session.complete_profile(details).await
    }

    /// # Errors
    ///
    /// See [`SessionManager::login_history`].
    pub async fn login_history(&self) -> Result<Vec<LoginRecord>, SessionError> {
        self.session.login_history().await
    }

    /// Replace the jewelry box of the cached profile, if one is cached
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn update_jewelry_box(&self, items: Vec<JewelryItem>) -> Result<bool, SessionError> {
        Ok(self.cache.update_jewelry_box(items).await?)
    }

    pub async fn check_server_connection(&self) -> bool {
        self.session.gateway().check_server_connection().await
    }
}

#[async_trait]
impl SessionService for AuthClient {
    async fn login(&self, email: &str, password: &str) -> Option<String> {
        self.session.login(email, password).await
    }

    async fn logout(&self) {
        self.session.logout().await;
    }

    async fn refresh_auth(&self) -> Result<(), SessionError> {
        self.session.refresh_auth().await
    }

    async fn get_profile(&self) -> Result<Option<ProfileRecord>, SessionError> {
        self.fetcher.get_profile().await
    }

    async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }
}

//! Client factory
//!
//! Builds a fully configured [`AuthClient`] from [`Settings`]: the reqwest
//! gateway, the file store (encrypted when a key is configured) and the
//! system clock.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::client::AuthClient;
use crate::clock::SystemClock;
use crate::gateway::ReqwestGateway;
use crate::session::Navigator;
use crate::settings::Settings;
use crate::storage::FileStore;

pub struct AuthClientFactory;

impl AuthClientFactory {
    /// Create a client wired from settings
    ///
    /// The persisted session is not read here; call `refresh_auth` on the
    /// returned client to pick it up.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_settings(settings: &Settings, navigator: Arc<dyn Navigator>) -> Result<AuthClient> {
        log::info!("🏭 Building session client...");

        let gateway = ReqwestGateway::from_settings(settings)
            .with_context(|| format!("Invalid API settings for {}", settings.api.base_url))?;
        log::info!(
            "✅ Backend: {} (timeout {}s)",
            gateway.base_url(),
            settings.api_timeout().as_secs()
        );

        let store = Self::create_store(settings);

        let client = AuthClient::builder()
            .with_store(Arc::new(store))
            .with_gateway(Arc::new(gateway))
            .with_navigator(navigator)
            .with_clock(Arc::new(SystemClock))
            .with_profile_ttl(settings.profile_ttl())
            .build()?;

        log::info!(
            "✅ Profile cache TTL: {} minutes",
            settings.cache.profile_ttl_minutes
        );
        Ok(client)
    }

    fn create_store(settings: &Settings) -> FileStore {
        let store = FileStore::new(&settings.storage.path);
        if let Some(key) = settings.storage_encryption_key() {
            log::info!("🔒 Session store: {} (encrypted)", settings.storage.path);
            store.with_encryption_key(key)
        } else {
            log::info!("⚠️  Session store: {} (unencrypted)", settings.storage.path);
            store
        }
    }
}

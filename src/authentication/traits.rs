//! Session service trait
//!
//! The interface the UI layer holds on to. It is injected rather than reached
//! through a global, so screens and tests can supply their own implementation.

use async_trait::async_trait;

use crate::profile::ProfileRecord;
use crate::session::SessionError;

/// Session operations exposed to the UI layer
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Sign in with e-mail and password
    ///
    /// # Returns
    /// * `Some(token)` - the session is established and persisted
    /// * `None` - sign-in failed; nothing was changed
    async fn login(&self, email: &str, password: &str) -> Option<String>;

    /// Sign out; safe to call when already signed out
    async fn logout(&self);

    /// Re-read the persisted session after an out-of-band credential change
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    async fn refresh_auth(&self) -> Result<(), SessionError>;

    /// The current user's profile, from cache or network
    ///
    /// # Errors
    /// Returns an error on transport, parse or storage failure.
    async fn get_profile(&self) -> Result<Option<ProfileRecord>, SessionError>;

    /// Derived from the presence of a token; used for render-gating
    async fn is_authenticated(&self) -> bool;
}

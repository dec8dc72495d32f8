//! Authenticated Profile Fetcher
//!
//! Serves the profile from the cache when it is fresh, owned by the current
//! identity and the token is still valid; otherwise fetches it from the
//! backend. This is the only place where a 401 is acted upon: the token is
//! refreshed once and the request retried once, and if that does not help
//! the session is ended.
//!
//! Concurrent calls for the same token share one in-flight fetch. The fetch
//! runs on its own task: a caller that is dropped midway does not cancel it,
//! and its result is discarded once it completes.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, OnceCell};

use super::types::ProfileRecord;
use crate::clock::Clock;
use crate::gateway::{endpoints, ApiRequest, ApiResponse, GatewayError, ResponseClass};
use crate::session::{SessionError, SessionManager};
use crate::token::TokenCodec;
use crate::utils::logging::LoggingHelper;

type FetchResult = Result<Option<ProfileRecord>, SessionError>;

type InFlight = Arc<Mutex<HashMap<String, Arc<OnceCell<FetchResult>>>>>;

#[derive(Clone)]
pub struct ProfileFetcher {
    session: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
}

impl ProfileFetcher {
    #[must_use]
    pub fn new(session: Arc<SessionManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            clock,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The current user's profile
    ///
    /// Returns `Ok(None)` when signed out, when the backend has no profile,
    /// when it refuses the request, or when the session had to be ended.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an unparseable body, or a
    /// storage failure. The session is left as it was.
    pub async fn get_profile(&self) -> FetchResult {
        let Some(token) = self.session.token_or_rehydrate().await? else {
            debug!("No session; skipping profile fetch");
            return Ok(None);
        };

        let cell = self
            .in_flight
            .lock()
            .await
            .entry(token.clone())
            .or_default()
            .clone();

        cell.get_or_init(|| self.spawn_load(token, Arc::clone(&cell)))
            .await
            .clone()
    }

    async fn spawn_load(&self, token: String, cell: Arc<OnceCell<FetchResult>>) -> FetchResult {
        let fetcher = self.clone();
        let task = tokio::spawn(async move {
            let result = fetcher.load(token.clone()).await;
            fetcher.release(&token, &cell).await;
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(GatewayError::Transport(format!("Profile fetch aborted: {e}")).into()),
        }
    }

    /// Forget `cell` so the next caller starts a fresh fetch
    async fn release(&self, token: &str, cell: &Arc<OnceCell<FetchResult>>) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(token)
            .is_some_and(|current| Arc::ptr_eq(current, cell))
        {
            in_flight.remove(token);
        }
    }

    async fn load(&self, token: String) -> FetchResult {
        let cache = self.session.profile_cache();

        if TokenCodec::is_expired(&token, self.clock.now()) {
            debug!("Token expired or undecodable; bypassing profile cache");
        } else {
            let owner = TokenCodec::owner_fingerprint(&token);
            if let Some(cached) = cache.get_for(owner.as_deref()).await? {
                debug!("Serving profile from cache");
                return Ok(Some(cached.profile));
            }
        }

        let mut bearer = token;
        let mut refreshed = false;
        loop {
            let response = self
                .session
                .gateway()
                .send(ApiRequest::get(endpoints::USER_PROFILE).with_bearer(bearer.as_str()))
                .await?;

            match response.classify() {
                ResponseClass::Success => return self.accept(&response, &bearer).await,
                ResponseClass::Rejected(status) => {
                    info!("Profile request refused (status {status}); keeping session");
                    return Ok(None);
                }
                ResponseClass::Unauthorized if !refreshed => {
                    refreshed = true;
                    if let Some(new_token) = self.session.refresh_token().await? {
                        debug!("Retrying profile fetch with refreshed token");
                        bearer = new_token;
                        continue;
                    }
                    break;
                }
                ResponseClass::Unauthorized => break,
            }
        }

        LoggingHelper::log_forced_deauthentication(endpoints::USER_PROFILE);
        self.session.deauthenticate().await;
        Ok(None)
    }

    async fn accept(&self, response: &ApiResponse, bearer: &str) -> FetchResult {
        let profile: ProfileRecord = serde_json::from_value(response.data.clone()).map_err(|e| {
            GatewayError::MalformedResponse(format!("{}: {e}", endpoints::USER_PROFILE))
        })?;

        if profile.is_placeholder() {
            info!("Backend returned a placeholder profile; not caching");
            return Ok(None);
        }

        // The session may have ended while the request was in flight
        let session = self.session.pin_session().await;
        if session.token() == Some(bearer) {
            let owner = TokenCodec::owner_fingerprint(bearer);
            if let Err(e) = self.session.profile_cache().put(&profile, owner.as_deref()).await {
                warn!("Failed to cache profile: {e}");
            }
        } else {
            debug!("Session changed during profile fetch; not caching");
        }
        drop(session);
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::keys;
    use crate::testing::{MockGateway, TestFixtures, TestHarness};
    use serde_json::json;

    #[tokio::test]
    async fn test_signed_out_makes_no_request() {
        let h = TestHarness::new();
        assert_eq!(h.fetcher().get_profile().await.unwrap(), None);
        assert!(h.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let h = TestHarness::new();
        let token = TestFixtures::valid_token();
        h.sign_in(&token).await;
        h.client
            .profile_cache()
            .put(
                &TestFixtures::profile(),
                TokenCodec::owner_fingerprint(&token).as_deref(),
            )
            .await
            .unwrap();

        let profile = h.fetcher().get_profile().await.unwrap().unwrap();
        assert_eq!(profile, TestFixtures::profile());
        assert!(h.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_bypasses_cache() {
        let h = TestHarness::new();
        let token = TestFixtures::expired_token();
        h.sign_in(&token).await;
        h.client
            .profile_cache()
            .put(
                &TestFixtures::profile(),
                TokenCodec::owner_fingerprint(&token).as_deref(),
            )
            .await
            .unwrap();
        h.gateway
            .respond(endpoints::USER_PROFILE, 200, TestFixtures::profile_json());

        assert!(h.fetcher().get_profile().await.unwrap().is_some());
        assert_eq!(h.gateway.request_count(endpoints::USER_PROFILE), 1);
    }

    #[tokio::test]
    async fn test_placeholder_profile_is_not_cached() {
        let h = TestHarness::new();
        h.sign_in(&TestFixtures::valid_token()).await;
        h.gateway
            .respond(endpoints::USER_PROFILE, 200, json!({ "id": 0, "username": "" }));

        assert_eq!(h.fetcher().get_profile().await.unwrap(), None);
        assert!(!h.store.contains_key(keys::USER_PROFILE).await);
        assert!(h.client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_second_unauthorized_does_not_recurse() {
        let h = TestHarness::new();
        h.sign_in(&TestFixtures::valid_token()).await;
        h.gateway.respond(endpoints::USER_PROFILE, 401, json!({}));
        h.gateway.respond(
            endpoints::REFRESH_TOKEN,
            200,
            json!({ "token": TestFixtures::expired_token() }),
        );
        h.gateway.respond(endpoints::USER_PROFILE, 401, json!({}));

        assert_eq!(h.fetcher().get_profile().await.unwrap(), None);
        assert_eq!(h.gateway.request_count(endpoints::USER_PROFILE), 2);
        assert_eq!(h.gateway.request_count(endpoints::REFRESH_TOKEN), 1);
        assert!(!h.client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_transport_error_keeps_session() {
        let h = TestHarness::new();
        h.sign_in(&TestFixtures::valid_token()).await;
        h.gateway.respond(endpoints::USER_PROFILE, 401, json!({}));
        h.gateway
            .fail(endpoints::REFRESH_TOKEN, GatewayError::Transport("offline".into()));

        let err = h.fetcher().get_profile().await.unwrap_err();
        assert!(err.is_transport());
        assert!(h.client.session().is_authenticated().await);
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_profile_propagates() {
        let h = TestHarness::new();
        h.sign_in(&TestFixtures::valid_token()).await;
        h.gateway.respond(endpoints::USER_PROFILE, 200, json!(["not", "a", "profile"]));

        assert!(matches!(
            h.fetcher().get_profile().await,
            Err(SessionError::Gateway(GatewayError::MalformedResponse(_)))
        ));
        assert!(!h.store.contains_key(keys::USER_PROFILE).await);
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_pin_its_result() {
        let h = TestHarness::with_gateway(MockGateway::new().with_delay(Duration::from_millis(50)));
        h.sign_in(&TestFixtures::valid_token()).await;
        h.gateway.fail(
            endpoints::USER_PROFILE,
            GatewayError::Transport("offline".into()),
        );

        let fetcher = Arc::clone(h.client.fetcher());
        let caller = tokio::spawn(async move { fetcher.get_profile().await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Hold the map until the fetch has finished and its caller is gone
        let guard = h.fetcher().in_flight.lock().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        caller.abort();
        assert!(caller.await.is_err());
        drop(guard);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.fetcher().in_flight.lock().await.is_empty());

        h.gateway
            .respond(endpoints::USER_PROFILE, 200, TestFixtures::profile_json());
        let profile = h.fetcher().get_profile().await.unwrap();
        assert_eq!(profile, Some(TestFixtures::profile()));
        assert_eq!(h.gateway.request_count(endpoints::USER_PROFILE), 2);
    }
}

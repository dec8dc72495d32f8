//! Test fixtures providing pre-built test objects

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::builders::TestTokenBuilder;
use super::constants::{TEST_EMAIL, TEST_NOW_SECONDS, TEST_USERNAME};
use super::mock::{MockClock, MockGateway, RecordingNavigator};
use crate::authentication::{AuthClient, SessionService};
use crate::profile::{ProfileFetcher, ProfileRecord};
use crate::storage::{keys, KeyValueStore, MemoryStore};
use crate::token::TokenCodec;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Instant every fixture clock starts at
    ///
    /// # Panics
    ///
    /// Never; the constant is a valid timestamp.
    #[must_use]
    pub fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(TEST_NOW_SECONDS, 0).expect("fixture timestamp is valid")
    }

    /// Token for the default test subject, valid for an hour
    #[must_use]
    pub fn valid_token() -> String {
        TestTokenBuilder::new().build()
    }

    #[must_use]
    pub fn valid_token_for(subject: &str) -> String {
        TestTokenBuilder::new().subject(subject).build()
    }

    /// A second valid token for the default subject, as a refresh would issue
    #[must_use]
    pub fn rotated_token() -> String {
        TestTokenBuilder::new()
            .claim("iat", Value::from(TEST_NOW_SECONDS + 60))
            .build()
    }

    #[must_use]
    pub fn expired_token() -> String {
        TestTokenBuilder::new().expired().build()
    }

    /// Owner fingerprint of [`TestFixtures::valid_token`]
    #[must_use]
    pub fn owner() -> Option<String> {
        TokenCodec::owner_fingerprint(&Self::valid_token())
    }

    #[must_use]
    pub fn profile_json() -> Value {
        json!({
            "id": 42,
            "email": TEST_EMAIL,
            "username": TEST_USERNAME,
            "firstname": "Gus",
            "lastname": "Goat",
            "avatar_url": "https://cdn.example.com/avatars/42.png",
            "jewelryBox": [{
                "id": 9,
                "name": "Emerald ring",
                "description": "Vintage cut",
                "category": "rings",
                "price": 420.0,
                "tags": "vintage,green",
                "photo_url": "https://cdn.example.com/items/9.jpg",
                "listedAt": "2025-12-01T10:00:00Z",
                "auction_ends_at": "2026-01-10T10:00:00Z",
                "bid_count": 3
            }]
        })
    }

    /// # Panics
    ///
    /// Never; the fixture JSON is a valid profile.
    #[must_use]
    pub fn profile() -> ProfileRecord {
        serde_json::from_value(Self::profile_json()).expect("fixture profile is valid")
    }
}

/// Fully wired client over in-memory collaborators
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<MockClock>,
    pub client: AuthClient,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_gateway(MockGateway::new())
    }

    /// # Panics
    ///
    /// Never; every required collaborator is supplied.
    #[must_use]
    pub fn with_gateway(gateway: MockGateway) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(gateway);
        let navigator = Arc::new(RecordingNavigator::new());
        let clock = Arc::new(MockClock::new(TestFixtures::now()));

        let client = AuthClient::builder()
            .with_store(store.clone())
            .with_gateway(gateway.clone())
            .with_navigator(navigator.clone())
            .with_clock(clock.clone())
            .build()
            .expect("harness client is fully wired");

        Self {
            store,
            gateway,
            navigator,
            clock,
            client,
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &ProfileFetcher {
        self.client.fetcher()
    }

    /// Persist a session as a completed login would, then hydrate memory from it
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store rejects the write.
    pub async fn sign_in(&self, token: &str) {
        self.store
            .multi_set(&[
                (keys::TOKEN, token.to_string()),
                (keys::USERNAME, TEST_USERNAME.to_string()),
            ])
            .await
            .expect("memory store accepts writes");
        self.client
            .refresh_auth()
            .await
            .expect("memory store accepts reads");
    }
}

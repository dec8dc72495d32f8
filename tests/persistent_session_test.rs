//! Sessions and cached profiles survive a restart when backed by a file store

use std::sync::Arc;

use keepsake::gateway::endpoints;
use keepsake::storage::{keys, KeyValueStore};
use keepsake::testing::{
    MockClock, MockGateway, RecordingNavigator, TestFixtures, TEST_EMAIL, TEST_PASSWORD,
    TEST_USERNAME,
};
use keepsake::{AuthClient, FileStore, SessionService, SessionState};
use serde_json::json;
use tempfile::TempDir;

const STORE_KEY: &[u8] = b"persistent-session-test-key";

struct Device {
    store: Arc<FileStore>,
    gateway: Arc<MockGateway>,
    client: AuthClient,
}

fn open_device(dir: &TempDir, encrypted: bool) -> Device {
    let mut store = FileStore::new(dir.path().join("session.json"));
    if encrypted {
        store = store.with_encryption_key(STORE_KEY);
    }
    let store = Arc::new(store);
    let gateway = Arc::new(MockGateway::new());
    let client = AuthClient::builder()
        .with_store(store.clone())
        .with_gateway(gateway.clone())
        .with_navigator(Arc::new(RecordingNavigator::new()))
        .with_clock(Arc::new(MockClock::new(TestFixtures::now())))
        .build()
        .unwrap();
    Device {
        store,
        gateway,
        client,
    }
}

async fn login_and_cache_profile(device: &Device) -> String {
    let token = TestFixtures::valid_token();
    device.gateway.respond(
        endpoints::LOGIN,
        200,
        json!({ "token": token, "username": TEST_USERNAME }),
    );
    device
        .gateway
        .respond(endpoints::USER_PROFILE, 200, TestFixtures::profile_json());

    assert!(device.client.login(TEST_EMAIL, TEST_PASSWORD).await.is_some());
    assert!(device.client.get_profile().await.unwrap().is_some());
    token
}

#[tokio::test]
async fn test_session_and_profile_survive_restart() {
    let dir = TempDir::new().unwrap();
    let token = {
        let device = open_device(&dir, false);
        login_and_cache_profile(&device).await
    };

    let device = open_device(&dir, false);
    assert_eq!(device.client.state().await, SessionState::Anonymous);
    device.client.refresh_auth().await.unwrap();
    assert_eq!(
        device.client.state().await,
        SessionState::Authenticated {
            username: Some(TEST_USERNAME.to_string())
        }
    );
    assert_eq!(device.client.session().current_token().await, Some(token));

    let profile = device.client.get_profile().await.unwrap();
    assert_eq!(profile, Some(TestFixtures::profile()));
    assert!(device.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_logout_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let device = open_device(&dir, false);
        login_and_cache_profile(&device).await;
        device.client.logout().await;
    }

    let device = open_device(&dir, false);
    device.client.refresh_auth().await.unwrap();
    assert!(!device.client.is_authenticated().await);
    for key in keys::SESSION_KEYS {
        assert_eq!(device.store.get(key).await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_encrypted_store_round_trips_and_hides_token() {
    let dir = TempDir::new().unwrap();
    let token = {
        let device = open_device(&dir, true);
        login_and_cache_profile(&device).await
    };

    let on_disk = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
    assert!(!on_disk.contains(&token));
    assert!(!on_disk.contains(TEST_USERNAME));

    let device = open_device(&dir, true);
    device.client.refresh_auth().await.unwrap();
    assert_eq!(device.client.session().current_token().await, Some(token));
}

#[tokio::test]
async fn test_rotated_key_discards_unreadable_store() {
    let dir = TempDir::new().unwrap();
    {
        let device = open_device(&dir, true);
        login_and_cache_profile(&device).await;
    }

    let store = FileStore::new(dir.path().join("session.json")).with_encryption_key(b"other");
    assert_eq!(store.get(keys::TOKEN).await.unwrap(), None);
    assert!(store.quarantine_path().exists());
}

#[tokio::test]
async fn test_login_recovers_from_corrupt_store() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session.json"), "{ truncated by crash").unwrap();

    let device = open_device(&dir, false);
    device.client.refresh_auth().await.unwrap();
    assert!(!device.client.is_authenticated().await);
    device.client.logout().await;

    let token = login_and_cache_profile(&device).await;
    assert_eq!(device.client.session().current_token().await, Some(token.clone()));

    let reopened = open_device(&dir, false);
    reopened.client.refresh_auth().await.unwrap();
    assert_eq!(reopened.client.session().current_token().await, Some(token));
}

//! Mock objects and fake implementations for testing
//!
//! Mocks record what they observe behind `std::sync::Mutex`es and never panic
//! on a poisoned lock, so one failed assertion does not cascade.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::clock::Clock;
use crate::gateway::{ApiRequest, ApiResponse, GatewayError, HttpGateway};
use crate::session::{Navigator, Route};
use crate::storage::{KeyValueStore, MemoryStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Reply {
    Respond(ApiResponse),
    Fail(GatewayError),
}

/// Gateway answering from per-endpoint scripts
///
/// Replies for an endpoint are consumed in the order they were queued. A
/// request with nothing queued fails with a transport error.
#[derive(Default)]
pub struct MockGateway {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every reply for `delay`, to let concurrent callers overlap
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response for `endpoint`
    pub fn respond(&self, endpoint: &str, status: u16, data: Value) {
        self.push(endpoint, Reply::Respond(ApiResponse::new(status, data)));
    }

    /// Queue a failure for `endpoint`
    pub fn fail(&self, endpoint: &str, error: GatewayError) {
        self.push(endpoint, Reply::Fail(error));
    }

    fn push(&self, endpoint: &str, reply: Reply) {
        lock(&self.replies)
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request sent so far
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn requests_to(&self, endpoint: &str) -> Vec<ApiRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn request_count(&self, endpoint: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    /// Number of queued replies not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.replies).values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl HttpGateway for MockGateway {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let endpoint = request.endpoint.clone();
        lock(&self.requests).push(request);

        let reply = lock(&self.replies)
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(error)) => Err(error),
            None => Err(GatewayError::Transport(format!(
                "no scripted reply for {endpoint}"
            ))),
        }
    }
}

/// Navigator that remembers every route it was asked to show
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Route> {
        lock(&self.routes).last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        lock(&self.routes).push(route);
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock by `delta`; negative values move it back
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = lock(&self.now);
        *now += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Store whose reads or writes can be switched to fail
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Write directly to the backing map, bypassing failure injection
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store rejects the write.
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner
            .set(key, value)
            .await
            .expect("memory store accepts writes");
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Io(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(&self.fail_reads, "read")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "write")?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "write")?;
        self.inner.remove(key).await
    }

    async fn multi_set(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "write")?;
        self.inner.multi_set(entries).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "write")?;
        self.inner.multi_remove(keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_gateway_replays_in_order() {
        let gateway = MockGateway::new();
        gateway.respond("/a", 200, json!({ "n": 1 }));
        gateway.fail("/a", GatewayError::Timeout("slow".into()));

        assert_eq!(gateway.send(ApiRequest::get("/a")).await.unwrap().data["n"], 1);
        assert!(matches!(
            gateway.send(ApiRequest::get("/a")).await,
            Err(GatewayError::Timeout(_))
        ));
        assert!(matches!(
            gateway.send(ApiRequest::get("/a")).await,
            Err(GatewayError::Transport(_))
        ));
        assert_eq!(gateway.request_count("/a"), 3);
        assert_eq!(gateway.pending(), 0);
    }

    #[tokio::test]
    async fn test_failing_store_toggles() {
        let store = FailingStore::new();
        store.fail_writes(true);
        assert!(store.set("k", "v").await.is_err());
        store.seed("k", "v").await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.fail_reads(true);
        assert!(store.get("k").await.is_err());
    }

    #[test]
    fn test_mock_clock_moves_both_ways() {
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let clock = MockClock::new(start);
        clock.advance(TimeDelta::seconds(5));
        assert_eq!(clock.now().timestamp(), 1_005);
        clock.advance(-TimeDelta::seconds(10));
        assert_eq!(clock.now().timestamp(), 995);
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}

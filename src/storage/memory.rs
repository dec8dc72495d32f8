use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError};

/// In-process store; contents are lost when the value is dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is currently present
    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn multi_set(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        for (key, value) in entries {
            guard.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut guard = self.entries.write().await;
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }
}

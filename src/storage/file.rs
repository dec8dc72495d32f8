//! File-backed store
//!
//! The whole key space is kept in a single JSON document. Every mutation is
//! applied to a copy, written to a sibling temp file and renamed over the
//! original, so a crash mid-write leaves either the old or the new document
//! on disk. With an encryption key configured the document is sealed with
//! AES-256-GCM before it touches the disk.
//!
//! A document that cannot be decrypted or parsed is moved aside to
//! `<path>.corrupt` and the store starts empty, so a damaged file or a
//! rotated key costs the session but never locks the client out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreError};
use crate::utils::crypto::{decrypt_data, derive_encryption_key, encrypt_data, ENCRYPTION_KEY_SIZE};

type Entries = BTreeMap<String, String>;

pub struct FileStore {
    path: PathBuf,
    encryption_key: Option<[u8; ENCRYPTION_KEY_SIZE]>,
    // Lazily loaded on first access, then authoritative for this process
    entries: Mutex<Option<Entries>>,
}

impl FileStore {
    /// Create a plaintext store at `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encryption_key: None,
            entries: Mutex::new(None),
        }
    }

    /// Encrypt the document at rest with a key derived from `key_material`
    #[must_use]
    pub fn with_encryption_key(mut self, key_material: &[u8]) -> Self {
        self.encryption_key = Some(derive_encryption_key(key_material));
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }

    async fn load(&self) -> Result<Entries, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match self.decode(&contents) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!("Discarding unreadable session store: {e}");
                    self.quarantine().await;
                    Ok(Entries::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session store at {}; starting empty", self.path.display());
                Ok(Entries::new())
            }
            Err(e) => Err(StoreError::Io(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    #[must_use]
    pub fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    async fn quarantine(&self) {
        let target = self.quarantine_path();
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => warn!("Moved unreadable store to {}", target.display()),
            // The next write replaces the document anyway
            Err(e) => warn!("Failed to move {} aside: {e}", self.path.display()),
        }
    }

    fn decode(&self, contents: &str) -> Result<Entries, StoreError> {
        let contents = contents.trim();
        if contents.is_empty() {
            return Ok(Entries::new());
        }
        match &self.encryption_key {
            Some(key) => decrypt_data(contents, key).map_err(|e| {
                StoreError::Encryption(format!("Failed to open {}: {e}", self.path.display()))
            }),
            None => serde_json::from_str(contents).map_err(|e| {
                StoreError::Serialization(format!("Failed to parse {}: {e}", self.path.display()))
            }),
        }
    }

    fn encode(&self, entries: &Entries) -> Result<String, StoreError> {
        match &self.encryption_key {
            Some(key) => encrypt_data(entries, key)
                .map_err(|e| StoreError::Encryption(format!("Failed to seal store: {e}"))),
            None => serde_json::to_string_pretty(entries)
                .map_err(|e| StoreError::Serialization(format!("Failed to encode store: {e}"))),
        }
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let encoded = self.encode(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Io(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, encoded)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {e}", tmp_path.display())))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            warn!("Failed to replace {}: {e}", self.path.display());
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Apply `change` to a copy of the entries and commit it only once it is on disk
    async fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries) + Send,
    {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let current = guard.get_or_insert_with(Entries::new);

        let mut updated = current.clone();
        change(&mut updated);
        if updated == *current {
            return Ok(());
        }

        self.persist(&updated).await?;
        *current = updated;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.mutate(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn multi_set(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        self.mutate(|current| {
            for (key, value) in entries {
                current.insert((*key).to_string(), value.clone());
            }
        })
        .await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.mutate(|current| {
            for key in keys {
                current.remove(*key);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("session.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get("jwtToken").await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store_in(&dir)
            .multi_set(&[
                ("jwtToken", "a.b.c".to_string()),
                ("username", "goatmaster".to_string()),
            ])
            .await
            .unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("jwtToken").await.unwrap().as_deref(), Some("a.b.c"));
        assert_eq!(
            reopened.get("username").await.unwrap().as_deref(),
            Some("goatmaster")
        );
    }

    #[tokio::test]
    async fn test_multi_remove_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set("jwtToken", "t").await.unwrap();
        store.set("email", "goat@example.com").await.unwrap();
        store.multi_remove(&["jwtToken", "absent"]).await.unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("jwtToken").await.unwrap(), None);
        assert!(reopened.get("email").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set("k", "v").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ truncated by crash").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("jwtToken").await.unwrap(), None);
        assert_eq!(
            std::fs::read_to_string(store.quarantine_path()).unwrap(),
            "{ truncated by crash"
        );
        assert!(!path.exists());

        store.set("jwtToken", "a.b.c").await.unwrap();
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("jwtToken").await.unwrap().as_deref(), Some("a.b.c"));
    }

    #[tokio::test]
    async fn test_corrupt_file_does_not_block_removal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileStore::new(&path);
        store.multi_remove(&["jwtToken", "username"]).await.unwrap();
        assert!(store.quarantine_path().exists());
    }

    #[tokio::test]
    async fn test_encrypted_store_hides_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::new(&path).with_encryption_key(b"device-secret");
        assert!(store.is_encrypted());
        store.set("jwtToken", "secret-token").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret-token"));
        assert!(!raw.contains("jwtToken"));

        let reopened = FileStore::new(&path).with_encryption_key(b"device-secret");
        assert_eq!(
            reopened.get("jwtToken").await.unwrap().as_deref(),
            Some("secret-token")
        );
    }

    #[tokio::test]
    async fn test_wrong_key_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        FileStore::new(&path)
            .with_encryption_key(b"right")
            .set("jwtToken", "t")
            .await
            .unwrap();

        let wrong = FileStore::new(&path).with_encryption_key(b"wrong");
        assert_eq!(wrong.get("jwtToken").await.unwrap(), None);
        assert!(wrong.quarantine_path().exists());

        wrong.set("jwtToken", "fresh").await.unwrap();
        let reopened = FileStore::new(&path).with_encryption_key(b"wrong");
        assert_eq!(reopened.get("jwtToken").await.unwrap().as_deref(), Some("fresh"));
    }
}

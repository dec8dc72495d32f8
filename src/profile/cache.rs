//! Profile Cache
//!
//! A time-bounded copy of the user's profile kept in the [`KeyValueStore`]
//! under three keys: the JSON blob, the capture instant in unix milliseconds
//! and the owner fingerprint. All three are written and removed together.
//!
//! Local corruption is never surfaced to callers. An unparseable timestamp,
//! a timestamp from the future or an unreadable blob evicts the entry and is
//! reported as a miss.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};

use super::types::{CachedProfile, JewelryItem, ProfileRecord};
use crate::clock::Clock;
use crate::storage::{keys, KeyValueStore, StoreError};

pub const DEFAULT_PROFILE_TTL_MINUTES: i64 = 30;

enum Freshness {
    Fresh(DateTime<Utc>),
    Missing,
    Expired,
    Corrupt,
    Skewed,
}

pub struct ProfileCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl ProfileCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::minutes(DEFAULT_PROFILE_TTL_MINUTES),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    async fn freshness(&self) -> Result<Freshness, StoreError> {
        let Some(raw) = self.store.get(keys::PROFILE_CACHE_TIME).await? else {
            return Ok(Freshness::Missing);
        };

        let Some(captured_at) = raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|ms| *ms >= 0)
            .and_then(DateTime::from_timestamp_millis)
        else {
            warn!("Corrupted profile cache timestamp ({} chars)", raw.len());
            return Ok(Freshness::Corrupt);
        };

        let elapsed = self.clock.now() - captured_at;
        if elapsed < TimeDelta::zero() {
            warn!("Profile cache timestamp is in the future; clock discrepancy");
            return Ok(Freshness::Skewed);
        }
        if elapsed >= self.ttl {
            return Ok(Freshness::Expired);
        }
        Ok(Freshness::Fresh(captured_at))
    }

    /// Whether the cached profile must not be served
    ///
    /// A corrupt or future timestamp evicts the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn is_stale(&self) -> Result<bool, StoreError> {
        match self.freshness().await? {
            Freshness::Fresh(_) => Ok(false),
            Freshness::Missing | Freshness::Expired => Ok(true),
            Freshness::Corrupt | Freshness::Skewed => {
                self.clear().await?;
                Ok(true)
            }
        }
    }

    /// The cached profile, if fresh and readable
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn get(&self) -> Result<Option<CachedProfile>, StoreError> {
        let captured_at = match self.freshness().await? {
            Freshness::Fresh(at) => at,
            Freshness::Missing | Freshness::Expired => return Ok(None),
            Freshness::Corrupt | Freshness::Skewed => {
                self.clear().await?;
                return Ok(None);
            }
        };

        let Some(blob) = self.store.get(keys::USER_PROFILE).await? else {
            debug!("Profile cache timestamp without a profile; evicting");
            self.clear().await?;
            return Ok(None);
        };
        let profile: ProfileRecord = match serde_json::from_str(&blob) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Unreadable cached profile, evicting: {e}");
                self.clear().await?;
                return Ok(None);
            }
        };

        let owner = self
            .store
            .get(keys::PROFILE_CACHE_OWNER)
            .await?
            .filter(|o| !o.is_empty());

        Ok(Some(CachedProfile {
            profile,
            captured_at,
            owner,
        }))
    }

    /// Like [`ProfileCache::get`], but only for the given owner
    ///
    /// A fresh entry captured under another owner is evicted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn get_for(&self, owner: Option<&str>) -> Result<Option<CachedProfile>, StoreError> {
        let Some(cached) = self.get().await? else {
            return Ok(None);
        };
        if cached.owner.as_deref() != owner {
            warn!("Cached profile belongs to another identity; evicting");
            self.clear().await?;
            return Ok(None);
        }
        Ok(Some(cached))
    }

    /// Store a profile captured now
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be encoded or the store cannot be written.
    pub async fn put(&self, profile: &ProfileRecord, owner: Option<&str>) -> Result<(), StoreError> {
        let blob = serde_json::to_string(profile)
            .map_err(|e| StoreError::Serialization(format!("Failed to encode profile: {e}")))?;
        let captured_at = self.clock.now().timestamp_millis();

        self.store
            .multi_set(&[
                (keys::USER_PROFILE, blob),
                (keys::PROFILE_CACHE_TIME, captured_at.to_string()),
                (keys::PROFILE_CACHE_OWNER, owner.unwrap_or_default().to_string()),
            ])
            .await?;
        debug!("Cached profile at {captured_at}");
        Ok(())
    }

    /// Remove every cache key
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.multi_remove(keys::PROFILE_CACHE_KEYS).await
    }

    /// Edit the cached profile in place
    ///
    /// The edited record is stored with a fresh capture instant and the same
    /// owner. Returns whether a cached profile existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn update_field<F>(&self, mutator: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut ProfileRecord) + Send,
    {
        let Some(mut cached) = self.get().await? else {
            return Ok(false);
        };
        mutator(&mut cached.profile);
        self.put(&cached.profile, cached.owner.as_deref()).await?;
        Ok(true)
    }

    /// Replace the jewelry box of the cached profile
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn update_jewelry_box(&self, items: Vec<JewelryItem>) -> Result<bool, StoreError> {
        self.update_field(move |profile| profile.jewelry_box = Some(items))
            .await
    }

    /// Drop the cached profile unless it was captured under `owner`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    pub async fn retain_for_owner(&self, owner: Option<&str>) -> Result<(), StoreError> {
        let cached_owner = self
            .store
            .get(keys::PROFILE_CACHE_OWNER)
            .await?
            .filter(|o| !o.is_empty());
        let has_profile = self.store.get(keys::USER_PROFILE).await?.is_some();

        if has_profile && (owner.is_none() || cached_owner.as_deref() != owner) {
            debug!("Identity changed; dropping cached profile");
            self.clear().await?;
        }
        Ok(())
    }
}

//! Profile Module
//!
//! - [`types`] - the profile record and its cached form
//! - [`cache`] - TTL-bounded, owner-bound profile cache in the key-value store
//! - [`fetcher`] - cache-or-network retrieval with refresh-and-retry

pub mod cache;
pub mod fetcher;
pub mod types;

pub use cache::{ProfileCache, DEFAULT_PROFILE_TTL_MINUTES};
pub use fetcher::ProfileFetcher;
pub use types::{CachedProfile, JewelryItem, ProfileRecord};

//! Persisted key names
//!
//! These names are part of the durable contract with data written by earlier
//! app versions. Renaming any of them requires a migration step.

/// Bearer token of the active session
pub const TOKEN: &str = "jwtToken";

/// Display username of the active session
pub const USERNAME: &str = "username";

/// JSON-serialized cached profile record
pub const USER_PROFILE: &str = "userProfile";

/// Capture instant of the cached profile, unix milliseconds as a decimal string
pub const PROFILE_CACHE_TIME: &str = "profileCacheTime";

/// Fingerprint of the identity the cached profile was captured under
pub const PROFILE_CACHE_OWNER: &str = "profileCacheOwner";

/// Verified, lower-cased e-mail used by the registration flow
pub const EMAIL: &str = "email";

/// Profile blob written by older clients; only ever removed
pub const LEGACY_PROFILE: &str = "profile";

/// Profile cache written by older clients; only ever removed
pub const LEGACY_PROFILE_CACHE: &str = "profileCache";

pub const LEGACY_KEYS: &[&str] = &[LEGACY_PROFILE, LEGACY_PROFILE_CACHE];

/// Keys owned by the profile cache
pub const PROFILE_CACHE_KEYS: &[&str] = &[USER_PROFILE, PROFILE_CACHE_TIME, PROFILE_CACHE_OWNER];

/// Everything removed when a session ends
pub const SESSION_KEYS: &[&str] = &[
    TOKEN,
    USERNAME,
    USER_PROFILE,
    PROFILE_CACHE_TIME,
    PROFILE_CACHE_OWNER,
    LEGACY_PROFILE,
    LEGACY_PROFILE_CACHE,
];

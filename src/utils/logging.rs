// Centralized logging helpers; tokens are only ever logged as hints
use log::{info, warn};

use crate::utils::crypto::sha256_hex;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Short, non-reversible description of a bearer token for log lines
    #[must_use]
    pub fn token_hint(token: &str) -> String {
        let fingerprint = sha256_hex(token);
        format!("len={} fp={}", token.len(), &fingerprint[..8])
    }

    /// Log a newly established session
    pub fn log_session_established(username: &str, token: &str) {
        info!(
            "✅ Session established for {username} ({})",
            Self::token_hint(token)
        );
    }

    /// Log a rotated bearer token
    pub fn log_token_rotated(old_token: &str, new_token: &str) {
        info!(
            "🔄 Bearer token rotated ({} -> {})",
            Self::token_hint(old_token),
            Self::token_hint(new_token)
        );
    }

    /// Log that the session was cleared and why
    pub fn log_session_cleared(reason: &str) {
        info!("🚪 Session cleared: {reason}");
    }

    /// Log a forced end of session after the backend refused the credentials
    pub fn log_forced_deauthentication(endpoint: &str) {
        warn!("⛔ Credentials rejected by {endpoint}; ending session");
    }
}

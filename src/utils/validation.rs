// Input validation for credential and account flows
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

// Pragmatic shape check; the backend remains the authority on deliverability
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Normalize an e-mail address the way it is persisted: trimmed and lower-cased
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that an (already normalized) e-mail address looks deliverable
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Validate login input before any network call is made
///
/// Returns the normalized e-mail address on success.
///
/// # Errors
///
/// Returns a human readable message if the e-mail is malformed or the password is empty.
pub fn validate_login_input(email: &str, password: &str) -> Result<String, String> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        debug!("Rejecting login input: malformed email ({} chars)", email.len());
        return Err("a valid email address is required".to_string());
    }
    if password.is_empty() {
        return Err("password must not be empty".to_string());
    }
    Ok(email)
}

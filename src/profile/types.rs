//! Profile data types
//!
//! Records are decoded leniently: the backend has shipped several shapes of
//! the same profile over time, so missing fields fall back to defaults and
//! unknown fields are carried through the cache untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The user's profile as returned by `GET /api/user-profile`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "jewelryBox", default, skip_serializing_if = "Option::is_none")]
    pub jewelry_box: Option<Vec<JewelryItem>>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileRecord {
    /// The backend answers with `id: 0` when it has no real profile yet
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id == Some(0)
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.firstname.trim(), self.lastname.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// An item in the user's jewelry box
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JewelryItem {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(rename = "listedAt", default, skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_ends_at: Option<String>,
    #[serde(default)]
    pub bid_count: u32,
}

/// A profile as held by the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedProfile {
    pub profile: ProfileRecord,
    pub captured_at: DateTime<Utc>,
    /// Fingerprint of the identity the profile was captured under
    pub owner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_decode_keeps_unknown_fields() {
        let record: ProfileRecord = serde_json::from_value(json!({
            "id": 7,
            "email": "goat@example.com",
            "username": "goatmaster",
            "bio": "collector",
            "jewelryBox": [{ "id": 1, "name": "Ring", "price": 12.5, "listedAt": "2026-01-01" }],
        }))
        .unwrap();

        assert_eq!(record.id, Some(7));
        assert_eq!(record.firstname, "");
        assert_eq!(record.extra.get("bio"), Some(&json!("collector")));
        let items = record.jewelry_box.as_ref().unwrap();
        assert_eq!(items[0].listed_at.as_deref(), Some("2026-01-01"));

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["bio"], "collector");
        assert_eq!(encoded["jewelryBox"][0]["name"], "Ring");
    }

    #[test]
    fn test_placeholder_detection() {
        let placeholder: ProfileRecord = serde_json::from_value(json!({ "id": 0 })).unwrap();
        assert!(placeholder.is_placeholder());
        assert!(!ProfileRecord::default().is_placeholder());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut record = ProfileRecord {
            username: "goatmaster".to_string(),
            ..ProfileRecord::default()
        };
        assert_eq!(record.display_name(), "goatmaster");
        record.firstname = "Gus".to_string();
        assert_eq!(record.display_name(), "Gus");
    }
}

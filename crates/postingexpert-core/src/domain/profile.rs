//! Dashboard user profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::branding;

/// Profile as rendered on the dashboard, with defaults for anything the
/// backend omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub business_type: String,
    /// `"October 2026"`, or `"Recently"` when unknown
    pub join_date: String,
    pub posts_created: u64,
    pub connected_accounts: u64,
    /// Single brand per user; enforced only as a label
    pub brand_name: String,
}

impl UserProfile {
    /// Build from a `/user/profile` body.
    ///
    /// The brand comes from the backend, then the stored brand, then
    /// `"<username> Brand"`.
    pub fn from_response(
        body: &Value,
        stored_username: Option<&str>,
        stored_brand: Option<&str>,
    ) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let username = text("username")
            .or_else(|| non_empty(stored_username))
            .unwrap_or_else(|| "User".to_string());
        let brand_name = text("brand_name")
            .or_else(|| non_empty(stored_brand))
            .unwrap_or_else(|| branding::default_brand_name(&username));

        Self {
            email: text("email").unwrap_or_else(|| "user@example.com".to_string()),
            business_type: text("business_type").unwrap_or_else(|| "Not specified".to_string()),
            join_date: join_date(body.get("created_at")),
            posts_created: count(body.get("posts_created")),
            connected_accounts: count(body.get("connected_accounts")),
            username,
            brand_name,
        }
    }

    /// Profile used when the backend could not be reached
    pub fn fallback(stored_username: Option<&str>, stored_brand: Option<&str>) -> Self {
        Self::from_response(&Value::Null, stored_username, stored_brand)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn join_date(created_at: Option<&Value>) -> String {
    created_at
        .and_then(Value::as_i64)
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%B %Y").to_string())
        .unwrap_or_else(|| "Recently".to_string())
}

fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

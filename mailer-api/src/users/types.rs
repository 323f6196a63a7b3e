//! User records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account allowed to call the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique, stored lowercased
    pub email: String,
    /// Argon2 PHC string, never serialized
    #[serde(skip)]
    pub password_hash: String,
    /// Unique random key presented in `X-API-Key`
    pub api_key: String,
    pub daily_email_quota: u32,
    pub emails_sent_today: u32,
    /// Start of the next quota window
    pub reset_quota_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new account
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

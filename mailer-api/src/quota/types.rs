use crate::users::User;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of a user's quota window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub limit: u32,
    pub used: u32,
    pub resets_at: DateTime<Utc>,
}

impl QuotaSnapshot {
    /// Get remaining sends in the current window
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn status(&self) -> QuotaStatus {
        if self.used < self.limit {
            QuotaStatus::WithinQuota
        } else {
            QuotaStatus::Exhausted
        }
    }
}

impl From<&User> for QuotaSnapshot {
    fn from(user: &User) -> Self {
        QuotaSnapshot {
            limit: user.daily_email_quota,
            used: user.emails_sent_today,
            resets_at: user.reset_quota_date,
        }
    }
}

/// Quota check status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    WithinQuota,
    Exhausted,
}

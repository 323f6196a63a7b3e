use crate::db::{format_timestamp, parse_timestamp};
use crate::error::{MailerError, Result};
use crate::quota::types::{QuotaSnapshot, QuotaStatus};
use crate::users::User;
use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// First local midnight strictly after `now`
pub fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(&Local).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    let midnight = tomorrow.and_time(NaiveTime::MIN);

    // A DST jump can skip local midnight; fall back to the first valid hour after it
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Whether the user's quota window has elapsed at `now`
pub fn window_expired(user: &User, now: DateTime<Utc>) -> bool {
    now > user.reset_quota_date
}

/// Whether another send fits in the current window
pub fn can_send(user: &User) -> bool {
    QuotaSnapshot::from(user).status() == QuotaStatus::WithinQuota
}

/// Applies the daily reset and the per-send increment against the users table
pub struct QuotaTracker {
    db: SqlitePool,
}

impl QuotaTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Start a new window if the current one has elapsed.
    ///
    /// The write only applies while the stored reset date is still due, so
    /// concurrent callers converge on the same state. Dates are compared as
    /// instants, not text. `user` is refreshed in place. Returns true when
    /// the window had elapsed.
    pub async fn check_and_reset(&self, user: &mut User, now: DateTime<Utc>) -> Result<bool> {
        if !window_expired(user, now) {
            return Ok(false);
        }

        let next_reset = next_reset_after(now);
        let result = sqlx::query(
            r#"
            UPDATE users
            SET emails_sent_today = 0, reset_quota_date = ?, updated_at = ?
            WHERE id = ? AND julianday(reset_quota_date) <= julianday(?)
            "#,
        )
        .bind(format_timestamp(&next_reset))
        .bind(format_timestamp(&now))
        .bind(&user.id)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 1 {
            info!(
                "Quota window reset for user {} (next reset {})",
                user.id, next_reset
            );
            user.emails_sent_today = 0;
            user.reset_quota_date = next_reset;
        } else {
            debug!("Quota window for user {} already rolled over", user.id);
            self.refresh(user).await?;
            if window_expired(user, now) {
                warn!(
                    "Stored quota reset date for user {} could not be rolled over: {}",
                    user.id, user.reset_quota_date
                );
            }
        }

        Ok(true)
    }

    /// Reset if due, then fail with `QuotaExceeded` when the window is used up
    pub async fn ensure_can_send(&self, user: &mut User, now: DateTime<Utc>) -> Result<QuotaSnapshot> {
        self.check_and_reset(user, now).await?;

        let snapshot = QuotaSnapshot::from(&*user);
        if !can_send(user) {
            return Err(MailerError::QuotaExceeded {
                limit: snapshot.limit,
                used: snapshot.used,
                resets_at: snapshot.resets_at,
            });
        }

        Ok(snapshot)
    }

    /// Count one successful send, as a single atomic increment in the store
    pub async fn record_send(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET emails_sent_today = emails_sent_today + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MailerError::NotFound(format!("User not found: {}", user_id)));
        }

        Ok(())
    }

    /// Current stored quota state for a user
    pub async fn snapshot(&self, user_id: &str) -> Result<QuotaSnapshot> {
        let row = sqlx::query(
            "SELECT daily_email_quota, emails_sent_today, reset_quota_date FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| MailerError::NotFound(format!("User not found: {}", user_id)))?;

        let resets_at: String = row.try_get("reset_quota_date")?;

        Ok(QuotaSnapshot {
            limit: row.try_get("daily_email_quota")?,
            used: row.try_get("emails_sent_today")?,
            resets_at: parse_timestamp("reset_quota_date", &resets_at)?,
        })
    }

    async fn refresh(&self, user: &mut User) -> Result<()> {
        let current = self.snapshot(&user.id).await?;
        user.daily_email_quota = current.limit;
        user.emails_sent_today = current.used;
        user.reset_quota_date = current.resets_at;
        Ok(())
    }
}

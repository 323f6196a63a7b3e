//! User persistence and credential checks

use crate::db::{format_timestamp, parse_timestamp};
use crate::error::{MailerError, Result};
use crate::quota::next_reset_after;
use crate::users::types::{RegisterRequest, User};
use crate::utils::validate_email;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, api_key, daily_email_quota, \
     emails_sent_today, reset_quota_date, is_active, created_at, updated_at";

/// Stores API users with salted Argon2 password hashes
pub struct UserManager {
    db: SqlitePool,
    default_daily_quota: u32,
}

impl UserManager {
    pub fn new(db: SqlitePool, default_daily_quota: u32) -> Self {
        Self {
            db,
            default_daily_quota,
        }
    }

    /// Initialize the users table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                api_key TEXT NOT NULL UNIQUE,
                daily_email_quota INTEGER NOT NULL DEFAULT 100,
                emails_sent_today INTEGER NOT NULL DEFAULT 0,
                reset_quota_date TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Register a new user with a fresh API key
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        let name = request.name.trim().to_string();
        let email = request.email.trim().to_lowercase();

        if name.is_empty() || email.is_empty() || request.password.is_empty() {
            return Err(MailerError::Validation(
                "Name, email, and password are required".to_string(),
            ));
        }
        validate_email(&email)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(&request.password)?,
            api_key: Uuid::new_v4().to_string(),
            daily_email_quota: self.default_daily_quota,
            emails_sent_today: 0,
            reset_quota_date: next_reset_after(now),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, api_key, daily_email_quota,
                emails_sent_today, reset_quota_date, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.api_key)
        .bind(user.daily_email_quota)
        .bind(user.emails_sent_today)
        .bind(format_timestamp(&user.reset_quota_date))
        .bind(user.is_active)
        .bind(format_timestamp(&user.created_at))
        .bind(format_timestamp(&user.updated_at))
        .execute(&self.db)
        .await
        .map_err(|e| MailerError::from_unique(e, "User with this email already exists"))?;

        info!("User registered: {}", user.email);
        Ok(user)
    }

    /// Check an email/password pair
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(MailerError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let user = match self.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown user {}", email);
                return Err(invalid_credentials());
            }
        };

        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            warn!("Failed login for {}", email);
            Err(invalid_credentials())
        }
    }

    /// Resolve an API key to an active user
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE api_key = ? AND is_active = 1",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(api_key)
            .fetch_optional(&self.db)
            .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(row_to_user).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;

        row.map(row_to_user).transpose()
    }

    /// Replace the user's API key; the old key stops working immediately
    pub async fn regenerate_api_key(&self, user_id: &str) -> Result<User> {
        let api_key = Uuid::new_v4().to_string();

        let result = sqlx::query("UPDATE users SET api_key = ?, updated_at = ? WHERE id = ?")
            .bind(&api_key)
            .bind(format_timestamp(&Utc::now()))
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| MailerError::from_unique(e, "API key collision, try again"))?;

        if result.rows_affected() == 0 {
            return Err(MailerError::NotFound("User not found".to_string()));
        }

        info!("API key regenerated for user {}", user_id);
        self.require(user_id).await
    }

    /// Change a user's daily send limit
    pub async fn set_daily_quota(&self, email: &str, quota: u32) -> Result<User> {
        let user = self.require_by_email(email).await?;

        sqlx::query("UPDATE users SET daily_email_quota = ?, updated_at = ? WHERE id = ?")
            .bind(quota)
            .bind(format_timestamp(&Utc::now()))
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        info!("Daily quota for {} set to {}", user.email, quota);
        self.require(&user.id).await
    }

    /// Enable or disable API access for a user
    pub async fn set_active(&self, email: &str, active: bool) -> Result<User> {
        let user = self.require_by_email(email).await?;

        sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(format_timestamp(&Utc::now()))
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        info!("User {} active = {}", user.email, active);
        self.require(&user.id).await
    }

    /// All users, newest first
    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, rowid DESC",
            USER_COLUMNS
        );
        let rows = sqlx::query(&query).fetch_all(&self.db).await?;

        rows.into_iter().map(row_to_user).collect()
    }

    async fn require(&self, id: &str) -> Result<User> {
        self.get(id)
            .await?
            .ok_or_else(|| MailerError::NotFound("User not found".to_string()))
    }

    async fn require_by_email(&self, email: &str) -> Result<User> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| MailerError::NotFound(format!("User not found: {}", email)))
    }
}

fn invalid_credentials() -> MailerError {
    MailerError::Unauthorized("Invalid credentials".to_string())
}

/// Hash password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MailerError::PasswordHash(e.to_string()))
}

/// Constant-time check of a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| MailerError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn row_to_user(row: SqliteRow) -> Result<User> {
    let reset_quota_date: String = row.try_get("reset_quota_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        api_key: row.try_get("api_key")?,
        daily_email_quota: row.try_get("daily_email_quota")?,
        emails_sent_today: row.try_get("emails_sent_today")?,
        reset_quota_date: parse_timestamp("reset_quota_date", &reset_quota_date)?,
        is_active: row.try_get("is_active")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
        assert!(verify_password("hunter2", &first).unwrap());
        assert!(verify_password("hunter2", &second).unwrap());
        assert!(!verify_password("hunter3", &first).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("{0}")]
    Validation(String),

    #[error("Daily email quota exceeded")]
    QuotaExceeded {
        limit: u32,
        used: u32,
        resets_at: DateTime<Utc>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl MailerError {
    /// Errors caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MailerError::Validation(_)
                | MailerError::QuotaExceeded { .. }
                | MailerError::NotFound(_)
                | MailerError::Conflict(_)
                | MailerError::Unauthorized(_)
        )
    }

    /// Translate a unique-constraint failure into `Conflict`, pass anything else through
    pub(crate) fn from_unique(err: sqlx::Error, conflict: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                MailerError::Conflict(conflict.into())
            }
            _ => MailerError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, MailerError>;

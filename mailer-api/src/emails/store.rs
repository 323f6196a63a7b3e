//! Persistence for send records

use crate::db::{format_timestamp, parse_json_column, parse_timestamp, Page};
use crate::emails::types::{EmailRecord, EmailStatus};
use crate::error::{MailerError, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const EMAIL_COLUMNS: &str = "id, user_id, from_address, to_addresses, cc_addresses, \
     bcc_addresses, subject, text_body, html_body, attachments, status, status_message, \
     message_id, tags, metadata, ip_address, created_at, updated_at";

/// Stores one row per send attempt
pub struct EmailStore {
    db: SqlitePool,
}

impl EmailStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize the emails table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emails (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                from_address TEXT NOT NULL,
                to_addresses TEXT NOT NULL,
                cc_addresses TEXT NOT NULL,
                bcc_addresses TEXT NOT NULL,
                subject TEXT NOT NULL,
                text_body TEXT,
                html_body TEXT,
                attachments TEXT NOT NULL,
                status TEXT NOT NULL,
                status_message TEXT,
                message_id TEXT,
                tags TEXT NOT NULL,
                metadata TEXT NOT NULL,
                ip_address TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_user ON emails(user_id, created_at)")
            .execute(&self.db)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_status ON emails(status)")
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Persist a new record
    pub async fn insert(&self, record: &EmailRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO emails (
                id, user_id, from_address, to_addresses, cc_addresses, bcc_addresses,
                subject, text_body, html_body, attachments, status, status_message,
                message_id, tags, metadata, ip_address, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.from)
        .bind(serde_json::to_string(&record.to)?)
        .bind(serde_json::to_string(&record.cc)?)
        .bind(serde_json::to_string(&record.bcc)?)
        .bind(&record.subject)
        .bind(&record.text)
        .bind(&record.html)
        .bind(serde_json::to_string(&record.attachments)?)
        .bind(record.status.to_db_string())
        .bind(&record.status_message)
        .bind(&record.message_id)
        .bind(serde_json::to_string(&record.tags)?)
        .bind(serde_json::to_string(&record.metadata)?)
        .bind(&record.ip_address)
        .bind(format_timestamp(&record.created_at))
        .bind(format_timestamp(&record.updated_at))
        .execute(&self.db)
        .await?;

        debug!("Email record stored: {}", record.id);
        Ok(())
    }

    /// pending → sent
    pub async fn mark_sent(&self, id: &str, message_id: &str) -> Result<()> {
        self.finish(id, EmailStatus::Sent, None, Some(message_id)).await
    }

    /// pending → failed
    pub async fn mark_failed(&self, id: &str, reason: &str) -> Result<()> {
        self.finish(id, EmailStatus::Failed, Some(reason), None).await
    }

    /// Only pending records move, and only once
    async fn finish(
        &self,
        id: &str,
        status: EmailStatus,
        status_message: Option<&str>,
        message_id: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE emails
            SET status = ?, status_message = ?, message_id = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.to_db_string())
        .bind(status_message)
        .bind(message_id)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MailerError::Conflict(format!(
                "Email {} is not pending",
                id
            )));
        }

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<EmailRecord>> {
        let query = format!("SELECT {} FROM emails WHERE id = ?", EMAIL_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(row_to_record).transpose()
    }

    /// A user's records, newest first
    pub async fn history(&self, user_id: &str, page: Page) -> Result<Vec<EmailRecord>> {
        let query = format!(
            r#"
            SELECT {}
            FROM emails
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
            EMAIL_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: SqliteRow) -> Result<EmailRecord> {
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(EmailRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        from: row.try_get("from_address")?,
        to: parse_json_column(row.try_get("to_addresses")?)?,
        cc: parse_json_column(row.try_get("cc_addresses")?)?,
        bcc: parse_json_column(row.try_get("bcc_addresses")?)?,
        subject: row.try_get("subject")?,
        text: row.try_get("text_body")?,
        html: row.try_get("html_body")?,
        attachments: parse_json_column(row.try_get("attachments")?)?,
        status: EmailStatus::from_db_string(&status)
            .ok_or_else(|| MailerError::Parse(format!("Unknown email status: {}", status)))?,
        status_message: row.try_get("status_message")?,
        message_id: row.try_get("message_id")?,
        tags: parse_json_column(row.try_get("tags")?)?,
        metadata: parse_json_column(row.try_get("metadata")?)?,
        ip_address: row.try_get("ip_address")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

//! SQLite pool setup and shared row helpers

use crate::error::{MailerError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Open a pool, creating the database file if it does not exist yet
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Page size used when the caller gives none
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound on any single page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Skip/limit window for newest-first listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub skip: u32,
}

impl Page {
    /// Zero or missing limit means the default; oversized limits are capped
    pub fn new(limit: Option<u32>, skip: Option<u32>) -> Self {
        let limit = match limit {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(limit) => limit.min(MAX_PAGE_SIZE),
        };

        Self {
            limit,
            skip: skip.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MailerError::Parse(format!("Invalid {} date: {}", column, e)))
}

/// Decode a JSON text column, treating NULL as the type's default
pub(crate) fn parse_json_column<T>(value: Option<String>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match value {
        Some(raw) if !raw.is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_is_ordered() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(5);

        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert!(a < b);
        assert_eq!(parse_timestamp("created_at", &a).unwrap(), earlier);
    }

    #[test]
    fn test_page_defaults_and_cap() {
        assert_eq!(Page::default(), Page { limit: 10, skip: 0 });
        assert_eq!(Page::new(Some(0), Some(5)), Page { limit: 10, skip: 5 });
        assert_eq!(Page::new(Some(500), None).limit, MAX_PAGE_SIZE);
        assert_eq!(Page::new(Some(3), Some(1)), Page { limit: 3, skip: 1 });
    }

    #[test]
    fn test_parse_json_column_null() {
        let tags: Vec<String> = parse_json_column(None).unwrap();
        assert!(tags.is_empty());

        let tags: Vec<String> = parse_json_column(Some(r#"["a","b"]"#.to_string())).unwrap();
        assert_eq!(tags, vec!["a", "b"]);
    }
}

//! Template types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reusable email content with `{{name}}` placeholders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique identifier
    pub id: String,
    /// Owner's user id
    pub user_id: String,
    /// Template name, unique per owner
    pub name: String,
    pub description: Option<String>,
    /// Email subject, may contain placeholders
    pub subject: String,
    /// Plain text body
    pub text: Option<String>,
    /// HTML body
    pub html: String,
    /// Placeholder names, explicit or extracted from `html`
    pub variables: Vec<String>,
    /// Readable by every user when set
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Owner always, anyone else only for public templates
    pub fn is_readable_by(&self, user_id: &str) -> bool {
        self.is_public || self.user_id == user_id
    }
}

/// Request to create a new template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: String,
    /// Extracted from `html` when absent
    pub variables: Option<Vec<String>>,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub variables: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Output of rendering a template with caller data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

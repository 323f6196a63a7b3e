//! Template manager for CRUD operations

use crate::db::{format_timestamp, parse_json_column, parse_timestamp, Page};
use crate::error::{MailerError, Result};
use crate::templates::renderer::{TemplateData, TemplateRenderer};
use crate::templates::types::{
    CreateTemplateRequest, RenderedTemplate, Template, UpdateTemplateRequest,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

const TEMPLATE_COLUMNS: &str = "id, user_id, name, description, subject, text_body, html_body, \
     variables, is_public, created_at, updated_at";

const DUPLICATE_NAME: &str = "A template with this name already exists";

/// Manages email templates with database persistence
pub struct TemplateManager {
    db: SqlitePool,
}

impl TemplateManager {
    /// Create a new template manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize the templates table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                subject TEXT NOT NULL,
                text_body TEXT,
                html_body TEXT NOT NULL,
                variables TEXT NOT NULL,
                is_public BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, name)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_templates_user ON templates(user_id, created_at)",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_templates_public ON templates(is_public, created_at)",
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Create a new template owned by `owner_id`
    pub async fn create_template(
        &self,
        owner_id: &str,
        request: CreateTemplateRequest,
    ) -> Result<Template> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(MailerError::Validation("Template name is required".to_string()));
        }
        if request.subject.trim().is_empty() {
            return Err(MailerError::Validation("Subject is required".to_string()));
        }
        if request.html.trim().is_empty() {
            return Err(MailerError::Validation("HTML content is required".to_string()));
        }

        let variables = request
            .variables
            .unwrap_or_else(|| TemplateRenderer::extract_variables(&request.html));

        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4().to_string(),
            user_id: owner_id.to_string(),
            name,
            description: clean_optional(request.description),
            subject: request.subject,
            text: request.text.filter(|t| !t.is_empty()),
            html: request.html,
            variables,
            is_public: request.is_public,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO templates (
                id, user_id, name, description, subject, text_body, html_body,
                variables, is_public, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&template.id)
        .bind(&template.user_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.subject)
        .bind(&template.text)
        .bind(&template.html)
        .bind(serde_json::to_string(&template.variables)?)
        .bind(template.is_public)
        .bind(format_timestamp(&template.created_at))
        .bind(format_timestamp(&template.updated_at))
        .execute(&self.db)
        .await
        .map_err(|e| MailerError::from_unique(e, DUPLICATE_NAME))?;

        info!("Template created: {}", template.name);
        Ok(template)
    }

    /// Get a template the viewer may read (own or public)
    pub async fn get_template(&self, id: &str, viewer_id: &str) -> Result<Template> {
        match self.find(id).await? {
            Some(template) if template.is_readable_by(viewer_id) => Ok(template),
            _ => {
                warn!("Template not found or access denied: {}", id);
                Err(not_found())
            }
        }
    }

    /// List the owner's templates, newest first
    pub async fn list_templates(&self, owner_id: &str, page: Page) -> Result<Vec<Template>> {
        let query = format!(
            r#"
            SELECT {}
            FROM templates
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
            TEMPLATE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(owner_id)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(row_to_template).collect()
    }

    /// List templates shared by any user, newest first
    pub async fn list_public_templates(&self, page: Page) -> Result<Vec<Template>> {
        let query = format!(
            r#"
            SELECT {}
            FROM templates
            WHERE is_public = 1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
            TEMPLATE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(row_to_template).collect()
    }

    /// Update a template owned by `owner_id`
    ///
    /// Variables are re-extracted only when the HTML changes and no explicit
    /// list is given.
    pub async fn update_template(
        &self,
        id: &str,
        owner_id: &str,
        request: UpdateTemplateRequest,
    ) -> Result<Template> {
        let mut template = match self.find(id).await? {
            Some(template) if template.user_id == owner_id => template,
            _ => {
                warn!("Template not found or user doesn't have access: {}", id);
                return Err(not_found());
            }
        };

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(MailerError::Validation("Template name cannot be empty".to_string()));
            }
            template.name = name;
        }
        if let Some(description) = request.description {
            template.description = clean_optional(Some(description));
        }
        if let Some(subject) = request.subject {
            if subject.trim().is_empty() {
                return Err(MailerError::Validation("Subject cannot be empty".to_string()));
            }
            template.subject = subject;
        }
        if let Some(text) = request.text {
            template.text = Some(text).filter(|t| !t.is_empty());
        }
        if let Some(html) = request.html {
            if html.trim().is_empty() {
                return Err(MailerError::Validation("HTML content cannot be empty".to_string()));
            }
            if request.variables.is_none() {
                template.variables = TemplateRenderer::extract_variables(&html);
            }
            template.html = html;
        }
        if let Some(variables) = request.variables {
            template.variables = variables;
        }
        if let Some(is_public) = request.is_public {
            template.is_public = is_public;
        }
        template.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE templates
            SET name = ?, description = ?, subject = ?, text_body = ?, html_body = ?,
                variables = ?, is_public = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.subject)
        .bind(&template.text)
        .bind(&template.html)
        .bind(serde_json::to_string(&template.variables)?)
        .bind(template.is_public)
        .bind(format_timestamp(&template.updated_at))
        .bind(id)
        .bind(owner_id)
        .execute(&self.db)
        .await
        .map_err(|e| MailerError::from_unique(e, DUPLICATE_NAME))?;

        info!("Template updated: {}", template.name);
        Ok(template)
    }

    /// Delete a template owned by `owner_id`
    pub async fn delete_template(&self, id: &str, owner_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            warn!("Template not found or user doesn't have access: {}", id);
            return Err(not_found());
        }

        info!("Template deleted: {}", id);
        Ok(())
    }

    /// Render a readable template with caller data
    pub async fn render_template(
        &self,
        id: &str,
        viewer_id: &str,
        data: &TemplateData,
    ) -> Result<RenderedTemplate> {
        let template = self.get_template(id, viewer_id).await?;

        let missing = TemplateRenderer::missing_variables(&template, data);
        if !missing.is_empty() {
            debug!(
                "Rendering template {} without values for: {}",
                template.id,
                missing.join(", ")
            );
        }

        Ok(TemplateRenderer::render_template(&template, data))
    }

    async fn find(&self, id: &str) -> Result<Option<Template>> {
        let query = format!("SELECT {} FROM templates WHERE id = ?", TEMPLATE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(row_to_template).transpose()
    }
}

fn not_found() -> MailerError {
    MailerError::NotFound("Template not found or access denied".to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convert database row to Template
fn row_to_template(row: SqliteRow) -> Result<Template> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Template {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        subject: row.try_get("subject")?,
        text: row.try_get("text_body")?,
        html: row.try_get("html_body")?,
        variables: parse_json_column(row.try_get("variables")?)?,
        is_public: row.try_get("is_public")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

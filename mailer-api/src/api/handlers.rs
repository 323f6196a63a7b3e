//! Shared state, response envelopes and error mapping

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::error;

use crate::config::{Config, Environment};
use crate::emails::{DispatchService, EmailStore};
use crate::error::{MailerError, Result};
use crate::quota::{QuotaSnapshot, QuotaTracker};
use crate::templates::TemplateManager;
use crate::transport::MailTransport;
use crate::users::UserManager;

/// Shared application state
pub struct AppState {
    pub users: Arc<UserManager>,
    pub templates: Arc<TemplateManager>,
    pub dispatch: Arc<DispatchService>,
    pub environment: Environment,
    /// Attach the underlying error text to 500 responses
    pub expose_error_details: bool,
}

impl AppState {
    /// Wire the services over one pool, creating tables as needed
    pub async fn build(
        db: SqlitePool,
        config: &Config,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let users = Arc::new(UserManager::new(db.clone(), config.quota.default_daily_limit));
        let templates = Arc::new(TemplateManager::new(db.clone()));
        let store = Arc::new(EmailStore::new(db.clone()));
        users.init_db().await?;
        templates.init_db().await?;
        store.init_db().await?;

        let dispatch = Arc::new(DispatchService::new(
            Arc::new(QuotaTracker::new(db)),
            store,
            templates.clone(),
            transport,
            config.email.default_from.clone(),
        ));

        Ok(Self {
            users,
            templates,
            dispatch,
            environment: config.server.environment,
            expose_error_details: config.is_development(),
        })
    }

    /// Turn a service error into a response, hiding internals outside development
    pub fn reject(&self, err: MailerError) -> Rejection {
        let status = status_for(&err);

        let body = match err {
            MailerError::QuotaExceeded {
                limit,
                used,
                resets_at,
            } => ApiError {
                quota: Some(QuotaSnapshot {
                    limit,
                    used,
                    resets_at,
                }),
                ..ApiError::new("Daily email quota exceeded")
            },
            err if err.is_client_error() || matches!(err, MailerError::Transport(_)) => {
                ApiError::new(&err.to_string())
            }
            err => {
                error!("Request failed: {}", err);
                ApiError {
                    detail: self.expose_error_details.then(|| err.to_string()),
                    ..ApiError::new("Internal server error")
                }
            }
        };

        (status, Json(body))
    }
}

/// HTTP status for each error kind
pub fn status_for(err: &MailerError) -> StatusCode {
    match err {
        MailerError::Validation(_) => StatusCode::BAD_REQUEST,
        MailerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        MailerError::NotFound(_) => StatusCode::NOT_FOUND,
        MailerError::Conflict(_) => StatusCode::CONFLICT,
        MailerError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        MailerError::Transport(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            success: false,
            message: msg.to_string(),
            quota: None,
            detail: None,
        }
    }
}

pub type Rejection = (StatusCode, Json<ApiError>);

/// Successful response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: &str, data: T) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::data(data)
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::data(items)
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            count: None,
            data: None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<(StatusCode, Json<ApiResponse<T>>), Rejection>;

/// Unwrap a JSON body, reporting malformed input with the usual error envelope
pub fn json_body<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
) -> std::result::Result<T, Rejection> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        (
            rejection.status(),
            Json(ApiError::new(&rejection.body_text())),
        )
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub environment: &'static str,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "success",
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339(),
        environment: state.environment.as_str(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: axum::http::Uri) -> Rejection {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(&format!("Not Found - {}", uri.path()))),
    )
}

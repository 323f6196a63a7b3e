//! Email send and lookup endpoints

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::handlers::{json_body, ApiResponse, ApiResult, AppState};
use crate::db::Page;
use crate::emails::{EmailRecord, EmailStatus, SendEmailRequest, SendTemplatedRequest};

/// `?limit=&skip=`; unparsable values fall back to the defaults
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub skip: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(
            self.limit.as_deref().and_then(|v| v.trim().parse().ok()),
            self.skip.as_deref().and_then(|v| v.trim().parse().ok()),
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub id: String,
    pub message_id: Option<String>,
    pub status: EmailStatus,
}

impl From<&EmailRecord> for SendResult {
    fn from(record: &EmailRecord) -> Self {
        Self {
            id: record.id.clone(),
            message_id: record.message_id.clone(),
            status: record.status,
        }
    }
}

/// One row of the status and history endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub to: Vec<String>,
    pub subject: String,
    pub status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<EmailRecord> for EmailSummary {
    fn from(record: EmailRecord) -> Self {
        Self {
            id: record.id,
            to: record.to,
            subject: record.subject,
            status: record.status,
            status_message: record.status_message,
            message_id: record.message_id,
            created_at: record.created_at,
        }
    }
}

fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<String> {
    connect_info.map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// POST /api/v1/email/send
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> ApiResult<SendResult> {
    let request = json_body(payload)?;

    let record = state
        .dispatch
        .send_email(&user, request, client_ip(connect_info))
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(
            "Email sent successfully",
            SendResult::from(&record),
        )),
    ))
}

/// POST /api/v1/email/send-template
pub async fn send_templated_email(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<SendTemplatedRequest>, JsonRejection>,
) -> ApiResult<SendResult> {
    let request = json_body(payload)?;

    let record = state
        .dispatch
        .send_templated(&user, request, client_ip(connect_info))
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(
            "Templated email sent successfully",
            SendResult::from(&record),
        )),
    ))
}

/// GET /api/v1/email/status/:id
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<EmailSummary> {
    let record = state
        .dispatch
        .get_status(&id, &user)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((StatusCode::OK, Json(ApiResponse::data(record.into()))))
}

/// GET /api/v1/email/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<EmailSummary>> {
    let records = state
        .dispatch
        .get_history(&user, query.page())
        .await
        .map_err(|e| state.reject(e))?;

    let items = records
        .into_iter()
        .map(|record| EmailSummary {
            status_message: None,
            ..EmailSummary::from(record)
        })
        .collect();

    Ok((StatusCode::OK, Json(ApiResponse::list(items))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_fallbacks() {
        let query = PageQuery {
            limit: Some("abc".to_string()),
            skip: Some("4".to_string()),
        };
        assert_eq!(query.page(), Page { limit: 10, skip: 4 });

        assert_eq!(PageQuery::default().page(), Page::default());

        let query = PageQuery {
            limit: Some("1000".to_string()),
            skip: None,
        };
        assert_eq!(query.page().limit, 100);
    }
}

//! Account endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::handlers::{json_body, ApiResponse, ApiResult, AppState};
use crate::users::{RegisterRequest, User};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Account fields returned to their owner
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub api_key: String,
    pub daily_email_quota: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails_sent_today: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_quota_date: Option<DateTime<Utc>>,
}

impl AccountView {
    fn summary(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            api_key: user.api_key.clone(),
            daily_email_quota: user.daily_email_quota,
            emails_sent_today: None,
            reset_quota_date: None,
        }
    }

    fn with_usage(user: &User) -> Self {
        Self {
            emails_sent_today: Some(user.emails_sent_today),
            reset_quota_date: Some(user.reset_quota_date),
            ..Self::summary(user)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub api_key: String,
}

/// POST /api/v1/users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<AccountView> {
    let request = json_body(payload)?;

    let user = state
        .users
        .register(request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            AccountView::summary(&user),
        )),
    ))
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AccountView> {
    let request = json_body(payload)?;

    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await
        .map_err(|e| state.reject(e))?;

    let mut view = AccountView::with_usage(&user);
    view.reset_quota_date = None;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message("Login successful", view)),
    ))
}

/// GET /api/v1/users/profile
pub async fn profile(AuthUser(user): AuthUser) -> ApiResult<AccountView> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse::data(AccountView::with_usage(&user))),
    ))
}

/// POST /api/v1/users/regenerate-api-key
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<ApiKeyView> {
    let updated = state
        .users
        .regenerate_api_key(&user.id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(
            "API key regenerated successfully",
            ApiKeyView {
                api_key: updated.api_key,
            },
        )),
    ))
}

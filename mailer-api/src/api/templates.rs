//! API endpoints for email template management

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::emails::PageQuery;
use crate::api::handlers::{json_body, ApiResponse, ApiResult, AppState};
use crate::templates::{
    CreateTemplateRequest, RenderedTemplate, Template, TemplateData, UpdateTemplateRequest,
};

/// Body of a preview render
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub data: TemplateData,
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTemplateRequest>, JsonRejection>,
) -> ApiResult<Template> {
    let request = json_body(payload)?;

    let template = state
        .templates
        .create_template(&user.id, request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Template created successfully", template)),
    ))
}

/// GET /api/v1/templates - the caller's own templates
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Template>> {
    let templates = state
        .templates
        .list_templates(&user.id, query.page())
        .await
        .map_err(|e| state.reject(e))?;

    Ok((StatusCode::OK, Json(ApiResponse::list(templates))))
}

/// GET /api/v1/templates/public
pub async fn list_public_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Template>> {
    let templates = state
        .templates
        .list_public_templates(query.page())
        .await
        .map_err(|e| state.reject(e))?;

    Ok((StatusCode::OK, Json(ApiResponse::list(templates))))
}

/// GET /api/v1/templates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    let template = state
        .templates
        .get_template(&id, &user.id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((StatusCode::OK, Json(ApiResponse::data(template))))
}

/// PUT /api/v1/templates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTemplateRequest>, JsonRejection>,
) -> ApiResult<Template> {
    let request = json_body(payload)?;

    let template = state
        .templates
        .update_template(&id, &user.id, request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message("Template updated successfully", template)),
    ))
}

/// DELETE /api/v1/templates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state
        .templates
        .delete_template(&id, &user.id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::message("Template deleted successfully")),
    ))
}

/// POST /api/v1/templates/:id/render - preview with sample data
pub async fn render_template(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> ApiResult<RenderedTemplate> {
    let request = json_body(payload)?;

    let rendered = state
        .templates
        .render_template(&id, &user.id, &request.data)
        .await
        .map_err(|e| state.reject(e))?;

    Ok((StatusCode::OK, Json(ApiResponse::data(rendered))))
}

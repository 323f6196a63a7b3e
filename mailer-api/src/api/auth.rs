//! API key authentication

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, HeaderMap, StatusCode, Uri},
    Json,
};
use serde::Deserialize;

use crate::api::handlers::{ApiError, Rejection};
use crate::users::User;

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Key from the `X-API-Key` header, falling back to the `api_key` query parameter
pub fn extract_api_key(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<ApiKeyQuery>::try_from_uri(uri)
            .ok()
            .and_then(|Query(query)| query.api_key)
            .filter(|key| !key.is_empty())
    })
}

/// The user resolved from the request's API key
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("API key is required")),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("from-header"));
        let uri: Uri = "/api/v1/email/history?api_key=from-query".parse().unwrap();

        assert_eq!(extract_api_key(&headers, &uri).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_query_fallback_and_missing() {
        let uri: Uri = "/api/v1/email/history?limit=5&api_key=abc".parse().unwrap();
        assert_eq!(extract_api_key(&HeaderMap::new(), &uri).as_deref(), Some("abc"));

        let uri: Uri = "/api/v1/email/history".parse().unwrap();
        assert_eq!(extract_api_key(&HeaderMap::new(), &uri), None);
    }
}

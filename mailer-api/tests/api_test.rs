//! HTTP tests against the full router

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mailer_api::api::server::router;
use mailer_api::api::AppState;
use mailer_api::config::Config;
use mailer_api::db;
use mailer_api::transport::MockTransport;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_app(transport: MockTransport) -> Router {
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    let config = Config::default();
    let state = AppState::build(pool, &config, Arc::new(transport))
        .await
        .unwrap();

    router(Arc::new(state), config.server.max_body_bytes)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

/// Register an account and return its API key
async fn register(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        json_request(
            "POST",
            "/api/v1/users/register",
            None,
            json!({ "name": "Test", "email": email, "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["apiKey"].as_str().unwrap().to_string()
}

fn send_body() -> Value {
    json!({
        "to": ["customer@example.com"],
        "subject": "Order shipped",
        "text": "It is on the way",
        "tags": ["orders"],
        "metadata": { "orderId": 42 }
    })
}

#[tokio::test]
async fn test_health() {
    let app = setup_app(MockTransport::new()).await;

    let (status, body) = call(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = setup_app(MockTransport::new()).await;

    let (status, body) = call(&app, get("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not Found - /nope");
}

#[tokio::test]
async fn test_api_key_required() {
    let app = setup_app(MockTransport::new()).await;

    let (status, body) = call(&app, get("/api/v1/users/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "API key is required");

    let (status, body) = call(&app, get("/api/v1/users/profile", Some("bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or inactive API key");
}

#[tokio::test]
async fn test_register_login_profile() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/users/register",
            None,
            json!({ "name": "Dup", "email": "dev@example.com", "password": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with this email already exists");

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            None,
            json!({ "email": "dev@example.com", "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["apiKey"], key.as_str());
    assert_eq!(body["data"]["emailsSentToday"], 0);

    let (status, _) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            None,
            json!({ "email": "dev@example.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/api/v1/users/profile?api_key={}", key);
    let (status, body) = call(&app, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "dev@example.com");
    assert_eq!(body["data"]["dailyEmailQuota"], 100);
    assert!(body["data"]["resetQuotaDate"].is_string());
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_regenerate_api_key() {
    let app = setup_app(MockTransport::new()).await;
    let old_key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request("POST", "/api/v1/users/regenerate-api-key", Some(&old_key), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["data"]["apiKey"].as_str().unwrap().to_string();
    assert_ne!(new_key, old_key);

    let (status, _) = call(&app, get("/api/v1/users/profile", Some(&old_key))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, get("/api/v1/users/profile", Some(&new_key))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_status_and_history() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request("POST", "/api/v1/email/send", Some(&key), send_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email sent successfully");
    assert_eq!(body["data"]["status"], "sent");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, get(&format!("/api/v1/email/status/{}", id), Some(&key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Order shipped");
    assert_eq!(body["data"]["to"], json!(["customer@example.com"]));
    assert!(body["data"]["messageId"].is_string());

    let (status, body) = call(&app, get("/api/v1/email/history?limit=5", Some(&key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], id.as_str());

    let other = register(&app, "other@example.com").await;
    let (status, _) = call(&app, get(&format!("/api/v1/email/status/{}", id), Some(&other))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_validation_errors() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/email/send",
            Some(&key),
            json!({ "to": [], "subject": "x", "text": "y" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "At least one recipient is required");

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/email/send",
            Some(&key),
            json!({ "to": ["a@example.com"], "subject": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Either text or HTML content is required");
}

#[tokio::test]
async fn test_quota_exceeded_response() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    // Default quota is 100; exhaust it
    for _ in 0..100 {
        let (status, _) = call(
            &app,
            json_request("POST", "/api/v1/email/send", Some(&key), send_body()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &app,
        json_request("POST", "/api/v1/email/send", Some(&key), send_body()),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Daily email quota exceeded");
    assert_eq!(body["quota"]["limit"], 100);
    assert_eq!(body["quota"]["used"], 100);
    assert!(body["quota"]["resetsAt"].is_string());

    let (_, body) = call(&app, get("/api/v1/email/history?limit=500", Some(&key))).await;
    assert_eq!(body["count"], 100);
}

#[tokio::test]
async fn test_transport_failure_response() {
    let app = setup_app(MockTransport::failing("connection refused")).await;
    let key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request("POST", "/api/v1/email/send", Some(&key), send_body()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Transport error: connection refused");

    let (_, body) = call(&app, get("/api/v1/email/history", Some(&key))).await;
    assert_eq!(body["data"][0]["status"], "failed");
}

#[tokio::test]
async fn test_template_crud_and_templated_send() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/templates",
            Some(&key),
            json!({
                "name": "Welcome",
                "subject": "Welcome {{name}}",
                "html": "<h1>Hi {{name}}</h1>",
                "isPublic": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["variables"], json!(["name"]));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, get("/api/v1/templates/public", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = call(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/templates/{}", id),
            Some(&key),
            json!({ "description": "Onboarding" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Onboarding");

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/templates/{}/render", id),
            Some(&key),
            json!({ "data": { "name": "Ada" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subject"], "Welcome Ada");

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/v1/email/send-template",
            Some(&key),
            json!({
                "to": ["ada@example.com"],
                "templateId": id,
                "templateData": { "name": "Ada" }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Templated email sent successfully");

    let (status, _) = call(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/templates/{}", id))
            .header("X-API-Key", key.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, get(&format!("/api/v1/templates/{}", id), Some(&key))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Template not found or access denied");
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = setup_app(MockTransport::new()).await;
    let key = register(&app, "dev@example.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/email/send")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", key.as_str())
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = call(&app, request).await;
    assert!(status.is_client_error());
    assert_eq!(body["success"], false);
}

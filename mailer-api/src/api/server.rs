//! API Server - HTTP server for the REST API

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::auth::{extract_api_key, AuthUser};
use crate::api::handlers::{self, ApiError, AppState};
use crate::api::{emails, templates, users};

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
    max_body_bytes: usize,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: Arc<AppState>, addr: String, max_body_bytes: usize) -> Self {
        Self {
            state,
            addr,
            max_body_bytes,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        router(self.state.clone(), self.max_body_bytes)
    }

    /// Start the API server and serve until Ctrl-C
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("API server stopped");
        Ok(())
    }
}

/// Full application router
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let require_key = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let user_routes = Router::new()
        .route("/profile", get(users::profile))
        .route("/regenerate-api-key", post(users::regenerate_api_key))
        .route_layer(require_key())
        .route("/register", post(users::register))
        .route("/login", post(users::login));

    let email_routes = Router::new()
        .route("/send", post(emails::send_email))
        .route("/send-template", post(emails::send_templated_email))
        .route("/status/:id", get(emails::get_status))
        .route("/history", get(emails::get_history))
        .route_layer(require_key());

    let template_routes = Router::new()
        .route(
            "/",
            post(templates::create_template).get(templates::list_templates),
        )
        .route(
            "/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/:id/render", post(templates::render_template))
        .route_layer(require_key())
        .route("/public", get(templates::list_public_templates));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/email", email_routes)
        .nest("/api/v1/templates", template_routes)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Authentication middleware - resolves the API key to an active user
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let api_key = match extract_api_key(req.headers(), req.uri()) {
        Some(key) => key,
        None => {
            warn!("Request without API key: {}", req.uri().path());
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("API key is required")),
            )
                .into_response();
        }
    };

    match state.users.find_by_api_key(&api_key).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(AuthUser(user));
            next.run(req).await
        }
        Ok(None) => {
            warn!("Rejected unknown or inactive API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Invalid or inactive API key")),
            )
                .into_response()
        }
        Err(e) => state.reject(e).into_response(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

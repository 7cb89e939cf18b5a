//! # melo-server
//!
//! HTTP backend for Melo. Every request passes through the request logging
//! middleware, which assigns a correlation id, records the request and its
//! response as structured entries, and echoes the id in `x-correlation-id`.
//!
//! Routes:
//!
//! - `GET /health`
//! - `GET /api/logs` with [`LogQuery`](melo_logging::LogQuery) fields as query parameters
//! - `GET /api/logs/stats`
//! - `POST /api/logs/rotate`
//! - `POST /api/push/subscription`
//! - `GET /api/push/subscriptions`

pub mod config;
pub mod error;
pub mod maintenance;
pub mod middleware;
pub mod routes;
pub mod state;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use melo_logging::CORRELATION_ID_HEADER;
use tower_http::cors::CorsLayer;

pub use config::{MeloConfig, ServerConfig};
pub use state::{AppState, StoredSubscription};

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/logs", get(routes::list_logs))
        .route("/api/logs/stats", get(routes::log_stats))
        .route("/api/logs/rotate", post(routes::rotate_logs))
        .route("/api/push/subscription", post(routes::register_subscription))
        .route("/api/push/subscriptions", get(routes::list_subscriptions))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_logging,
        ))
        .with_state(state)
}

/// CORS for the web client served from `origin`; exposes the correlation id header
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
        .with_context(|| format!("Invalid client origin: {}", origin))?;
    let correlation = HeaderName::from_static(CORRELATION_ID_HEADER);

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, correlation.clone()])
        .expose_headers([correlation]))
}

//! HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use melo_logging::{LogQuery, LogStats, QueryResult};
use melo_push::PushSubscription;
use serde_json::{json, Value as JsonValue};

use crate::error::ApiResult;
use crate::middleware::RequestLog;
use crate::state::{AppState, StoredSubscription};

pub async fn health(State(state): State<AppState>) -> Json<JsonValue> {
    let config = state.logger.config();
    Json(json!({
        "status": "ok",
        "service": config.service,
        "version": config.version,
        "environment": config.environment,
        "inFlightRequests": state.request_logger.in_flight().len().await,
    }))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<QueryResult>> {
    let result = state.log_files.query(&query).await?;
    Ok(Json(result))
}

pub async fn log_stats(State(state): State<AppState>) -> ApiResult<Json<LogStats>> {
    Ok(Json(state.log_files.stats().await?))
}

pub async fn rotate_logs(
    State(state): State<AppState>,
    Extension(log): Extension<RequestLog>,
) -> ApiResult<Json<JsonValue>> {
    let rotated = state.log_files.rotate().await?;

    log.logger.info(
        "log rotation requested",
        Some(json!({ "rotated": rotated.len() })),
    );

    Ok(Json(json!({ "rotated": rotated })))
}

pub async fn register_subscription(
    State(state): State<AppState>,
    Extension(log): Extension<RequestLog>,
    Json(subscription): Json<PushSubscription>,
) -> impl IntoResponse {
    if subscription.endpoint.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "subscription endpoint is required" })));
    }

    let endpoint = subscription.endpoint.clone();
    let stored = StoredSubscription {
        subscription,
        correlation_id: log.correlation_id.clone(),
        updated_at: Utc::now(),
    };

    let replaced = state
        .subscriptions
        .write()
        .await
        .insert(endpoint.clone(), stored)
        .is_some();

    log.logger.info(
        "push subscription registered",
        Some(json!({ "endpoint": endpoint, "replaced": replaced })),
    );

    let status = if replaced { StatusCode::OK } else { StatusCode::CREATED };
    (status, Json(json!({ "endpoint": endpoint, "replaced": replaced })))
}

pub async fn list_subscriptions(State(state): State<AppState>) -> Json<Vec<StoredSubscription>> {
    let mut list: Vec<StoredSubscription> = state.subscriptions.read().await.values().cloned().collect();
    list.sort_by(|a, b| a.subscription.endpoint.cmp(&b.subscription.endpoint));
    Json(list)
}

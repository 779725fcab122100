//! `/health` and `/metrics` (§6, §10.4). No auth: these sit ahead of the
//! auth middleware in the router so orchestrators can probe without a token.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check)).route("/metrics", get(metrics_handler))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    redis: &'static str,
    db_pool_size: u32,
    db_pool_idle: usize,
}

/// Checks Postgres and Redis directly; returns 503 if either is unreachable
/// (the service is up but degraded, per §10.4).
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = state.repos.health_check().await.is_ok();
    let redis_ok = state.redis.health_check().await.is_ok();

    let body = HealthResponse {
        status: if db_ok && redis_ok { "healthy" } else { "degraded" },
        database: if db_ok { "healthy" } else { "unreachable" },
        redis: if redis_ok { "healthy" } else { "unreachable" },
        db_pool_size: state.repos.pool_size(),
        db_pool_idle: state.repos.pool_idle(),
    };

    let status = if db_ok && redis_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default()).into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

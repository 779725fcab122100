use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};
use tower_http::trace::TraceLayer;

pub mod digest;
pub mod history;
pub mod http;
pub mod hub;
pub mod ingestion;
pub mod jobs;
pub mod middleware;
pub mod observability;
pub mod security;
pub mod state;

use observability::metrics_middleware;
use security::{get_cors_layer, security_headers_middleware};
use state::AppState;

use axum::middleware as axum_middleware;

/// Assembles the full router (§10 ambient stack): resource routes from
/// `http::router`, layered with metrics, compression, tracing, CORS, and
/// security headers in the same order the teacher applies them.
pub fn create_app_router(app_state: Arc<AppState>) -> axum::Router {
    http::router(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .br(false)
                .deflate(true)
                .compress_when(SizeAbove::new(1024)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(get_cors_layer())
        .layer(axum_middleware::from_fn(security_headers_middleware))
}

//! HTTP surface (§6): one sub-router per resource, assembled here and
//! mounted under `/api/v1` with the auth middleware layered over every
//! path except `/api/v1/auth/*` and the WebSocket upgrade.

pub mod auth;
pub mod devices;
pub mod digest;
pub mod history;
pub mod models;
pub mod notifications;
pub mod rules;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;

use crate::hub::ws_upgrade_handler;
use crate::middleware::auth_middleware;
use crate::observability::health_router;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .nest("/api/v1/auth", devices::create_router())
        .nest("/api/v1/devices", devices::manage_router())
        .nest("/api/v1/notifications", notifications::router())
        .nest("/api/v1/history", history::router())
        .nest("/api/v1/digest", digest::router())
        .nest("/api/v1/rules", rules::router())
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public = Router::new()
        .nest("/api/v1/auth", auth::router())
        .route("/ws", get(ws_upgrade_handler))
        .merge(health_router());

    Router::new().merge(public).merge(protected).with_state(state)
}

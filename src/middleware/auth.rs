//! Auth middleware (C10): validates the signed access token and injects
//! `AuthenticatedUser` into request extensions for handlers downstream.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use shared::error::AppError;

use crate::state::AppState;

static DEVICE_ID_HEADER: HeaderName = HeaderName::from_static("x-device-id");

/// `{user_id, device_id?}` per §4.10 — `device_id` is only present on
/// requests that carry the `X-Device-Id` header (notification submission
/// and action endpoints); auth-only endpoints (devices, history, digest)
/// don't need one.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::authentication("missing authorization header"))?;

    let token = state.auth.extract_token_from_header(auth_header)?;
    let user_ctx = state.auth.extract_user_context(token)?;

    let device_id = request
        .headers()
        .get(&DEVICE_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    request.extensions_mut().insert(AuthenticatedUser { user_id: user_ctx.user_id, device_id });

    Ok(next.run(request).await)
}

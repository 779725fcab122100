//! `/api/v1/auth/*` — register, login, refresh (C11).

use axum::{extract::State, routing::post, Json, Router};
use shared::error::AppError;
use std::sync::Arc;
use validator::Validate;

use super::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    req.validate().map_err(|e| AppError::validation(e.to_string()))?;

    let password_hash = state.auth.hash_password(&req.password)?;
    let user = state.repos.users.create(&req.email, &password_hash).await?;
    let pair = state.auth.generate_token_pair(user.id)?;

    Ok(Json(AuthResponse::new(pair, user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .repos
        .users
        .get_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::authentication("invalid email or password"))?;

    let valid = state.auth.verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::authentication("invalid email or password"));
    }

    let pair = state.auth.generate_token_pair(user.id)?;
    Ok(Json(AuthResponse::new(pair, user)))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let pair = state.auth.refresh_access_token(&req.refresh_token)?;
    Ok(Json(pair.into()))
}

//! `/api/v1/auth/devices` (create) and `/api/v1/devices` (list/delete).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use shared::error::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::models::{CreateDeviceRequest, DeviceResponse, DevicesResponse};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/devices", post(create_device))
}

pub fn manage_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_devices)).route("/:id", axum::routing::delete(delete_device))
}

async fn create_device(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<DeviceResponse>), AppError> {
    req.validate().map_err(|e| AppError::validation(e.to_string()))?;
    let device = state
        .repos
        .devices
        .create(user.user_id, &req.device_name, req.device_type, req.push_token.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(DeviceResponse { device })))
}

async fn list_devices(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DevicesResponse>, AppError> {
    let devices = state.repos.devices.list(user.user_id).await?;
    Ok(Json(DevicesResponse { devices }))
}

async fn delete_device(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.repos.devices.delete(id, user.user_id).await?;
    if !deleted {
        return Err(AppError::not_found("device"));
    }
    Ok(StatusCode::NO_CONTENT)
}

//! `/api/v1/notifications/*` — submit, list, act on, and stat notifications.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use shared::error::AppError;
use shared::models::{ActionKind, Category, Notification};
use shared::repository::NotificationFilter;
use shared::types::PaginationParams;
use std::sync::Arc;
use uuid::Uuid;

use super::models::{
    ActionRequestKind, CreateNotificationRequest, ListNotificationsQuery,
    ListNotificationsResponse, NotificationActionRequest, NotificationStatsQuery,
};
use crate::digest::{get_daily_digest, DailyDigest};
use crate::ingestion::{self, CreateNotification};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(submit).get(list))
        .route("/:id/action", put(act))
        .route("/stats", get(stats))
}

fn require_device(user: &AuthenticatedUser) -> Result<Uuid, AppError> {
    user.device_id.ok_or_else(|| AppError::validation("X-Device-Id header is required"))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let device_id = require_device(&user)?;
    let input = CreateNotification {
        app_name: req.app_name,
        title: req.title,
        body: req.body,
        category: req.category,
        priority: req.priority,
        extras: req.extras,
        client_id: req.client_id,
        created_at: req.created_at,
    };
    let notification = ingestion::submit(&state, user.user_id, device_id, input).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ListNotificationsResponse>, AppError> {
    let category = query
        .category
        .as_deref()
        .map(|c| match c.to_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "personal" => Ok(Category::Personal),
            "junk" => Ok(Category::Junk),
            other => Err(AppError::validation(format!("invalid category '{other}'"))),
        })
        .transpose()?;

    let filter = NotificationFilter { search: query.search.clone(), category, ..Default::default() };

    let limit = query.limit.clamp(1, 100);
    let page = query.offset / limit.max(1) + 1;
    let paging = PaginationParams { page, page_size: limit };

    let (notifications, total) = state.repos.notifications.list(user.user_id, &filter, &paging).await?;

    Ok(Json(ListNotificationsResponse { notifications, total, limit: query.limit, offset: query.offset }))
}

async fn act(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(notification_id): Path<Uuid>,
    Json(req): Json<NotificationActionRequest>,
) -> Result<StatusCode, AppError> {
    let device_id = require_device(&user)?;
    let action = match req.action {
        ActionRequestKind::Read => ActionKind::Read,
        ActionRequestKind::Dismissed => ActionKind::Dismissed,
        ActionRequestKind::Clicked => ActionKind::Clicked,
    };
    ingestion::apply_action(&state, user.user_id, device_id, notification_id, action).await?;
    Ok(StatusCode::OK)
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<NotificationStatsQuery>,
) -> Result<Json<DailyDigest>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let digest = get_daily_digest(&state, user.user_id, date).await?;
    Ok(Json(digest))
}

//! `/api/v1/history/*` — list, search, stats, per-app usage (C9).

use axum::{extract::{Query, State}, routing::get, Extension, Json, Router};
use shared::error::AppError;
use shared::models::{Category, Notification};
use shared::repository::ReadStatusFilter;
use shared::types::{PaginatedResponse, PaginationParams};
use std::collections::HashMap;
use std::sync::Arc;

use super::models::{DaysQuery, HistorySearchQuery};
use crate::history::{app_usage, history_stats, list_history, search_history, HistoryStats, SearchFilters};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list))
        .route("/search", get(search))
        .route("/stats", get(stats))
        .route("/apps", get(apps))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(paging): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<Notification>>, AppError> {
    Ok(Json(list_history(&state, user.user_id, &paging).await?))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<HistorySearchQuery>,
) -> Result<Json<PaginatedResponse<Notification>>, AppError> {
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

    let read_status = query
        .read_status
        .as_deref()
        .map(|s| match s.to_lowercase().as_str() {
            "read" => Ok(ReadStatusFilter::Read),
            "unread" => Ok(ReadStatusFilter::Unread),
            "all" => Ok(ReadStatusFilter::All),
            other => Err(AppError::validation(format!("invalid read_status '{other}'"))),
        })
        .transpose()?;

    let filters = SearchFilters {
        query: query.q,
        app_name: query.app_name,
        category,
        read_status,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let paging = PaginationParams { page: query.page, page_size: query.page_size };

    Ok(Json(search_history(&state, user.user_id, filters, &paging).await?))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<HistoryStats>, AppError> {
    Ok(Json(history_stats(&state, user.user_id, query.days).await?))
}

async fn apps(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    Ok(Json(app_usage(&state, user.user_id, query.days).await?))
}

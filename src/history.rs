//! History / search / stats service (C9): paginated history, combinable
//! search filters, aggregate statistics cached for an hour.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::cache::CacheKeys;
use shared::repository::{NotificationFilter, ReadStatusFilter};
use shared::types::{PaginatedResponse, PaginationParams};
use shared::{Category, Notification, Result};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub query: Option<String>,
    pub app_name: Option<String>,
    pub category: Option<Category>,
    pub read_status: Option<ReadStatusFilter>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn list_history(
    state: &Arc<AppState>,
    user_id: Uuid,
    paging: &PaginationParams,
) -> Result<PaginatedResponse<Notification>> {
    let filter = NotificationFilter::default();
    let (items, total) = state.repos.notifications.list(user_id, &filter, paging).await?;
    Ok(PaginatedResponse::new(items, paging, total))
}

pub async fn search_history(
    state: &Arc<AppState>,
    user_id: Uuid,
    filters: SearchFilters,
    paging: &PaginationParams,
) -> Result<PaginatedResponse<Notification>> {
    let filter = NotificationFilter {
        search: filters.query,
        app_name: filters.app_name,
        category: filters.category,
        read_status: filters.read_status,
        start_date: filters.start_date,
        end_date: filters.end_date,
    };
    let (items, total) = state.repos.notifications.list(user_id, &filter, paging).await?;
    Ok(PaginatedResponse::new(items, paging, total))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: i64,
    pub active_days: i64,
    pub unique_apps: i64,
    pub category_breakdown: HashMap<String, i64>,
    pub daily_breakdown: HashMap<String, i64>,
}

pub async fn history_stats(state: &Arc<AppState>, user_id: Uuid, days: i64) -> Result<HistoryStats> {
    let cache_key = CacheKeys::history_stats(user_id, days);
    if let Ok(Some(cached)) = state.redis.get_json::<HistoryStats>(&cache_key).await {
        return Ok(cached);
    }

    let since = Utc::now() - chrono::Duration::days(days);
    let notifications = state.repos.notifications.list_for_user_since(user_id, since).await?;
    let active_days = state.repos.notifications.distinct_active_days(user_id, since).await?;

    let mut category_breakdown: HashMap<String, i64> = HashMap::new();
    let mut daily_breakdown: HashMap<String, i64> = HashMap::new();
    let mut apps = std::collections::HashSet::new();
    for n in &notifications {
        *category_breakdown.entry(n.category.as_str().to_string()).or_insert(0) += 1;
        *daily_breakdown.entry(n.created_at.format("%Y-%m-%d").to_string()).or_insert(0) += 1;
        apps.insert(n.app_name.clone());
    }

    let stats = HistoryStats {
        total: notifications.len() as i64,
        active_days,
        unique_apps: apps.len() as i64,
        category_breakdown,
        daily_breakdown,
    };

    if let Err(e) = state.redis.set_json(&cache_key, &stats, 3600).await {
        tracing::warn!(%user_id, "history stats cache write failed: {e}");
    }

    Ok(stats)
}

pub async fn app_usage(state: &Arc<AppState>, user_id: Uuid, days: i64) -> Result<HashMap<String, i64>> {
    let since = Utc::now() - chrono::Duration::days(days);
    let notifications = state.repos.notifications.list_for_user_since(user_id, since).await?;
    let mut apps: HashMap<String, i64> = HashMap::new();
    for n in &notifications {
        *apps.entry(n.app_name.clone()).or_insert(0) += 1;
    }
    Ok(apps)
}

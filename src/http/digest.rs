//! `/api/v1/digest/*` — daily/weekly digest views (C8).

use axum::{extract::{Path, State}, routing::get, Extension, Json, Router};
use chrono::{NaiveDate, Utc};
use shared::error::AppError;
use std::sync::Arc;

use crate::digest::{get_daily_digest, get_weekly_digest, DailyDigest};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(today))
        .route("/today", get(today))
        .route("/date/:date", get(by_date))
        .route("/weekly", get(weekly))
        .route("/summary", get(today))
}

async fn today(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DailyDigest>, AppError> {
    let today = Utc::now().date_naive();
    Ok(Json(get_daily_digest(&state, user.user_id, today).await?))
}

async fn by_date(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DailyDigest>, AppError> {
    Ok(Json(get_daily_digest(&state, user.user_id, date).await?))
}

async fn weekly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<DailyDigest>>, AppError> {
    Ok(Json(get_weekly_digest(&state, user.user_id).await?))
}

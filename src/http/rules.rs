//! `/api/v1/rules` — user rule CRUD. Not part of §6's route table (the
//! spec is silent on how rules reach storage); supplied because the rule
//! engine (C5) and its repository are otherwise unreachable from outside
//! the process. See DESIGN.md.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use shared::error::AppError;
use shared::models::UserRule;
use std::sync::Arc;
use uuid::Uuid;

use super::models::{CreateRuleRequest, RulesResponse};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", axum::routing::delete(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<RulesResponse>, AppError> {
    let rules = state.repos.user_rules.list(user.user_id).await?;
    Ok(Json(RulesResponse { rules }))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<UserRule>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("name is required"));
    }
    let rule = UserRule {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        name: req.name,
        rule_type: req.rule_type,
        priority: req.priority,
        conditions: sqlx::types::Json(req.conditions),
        actions: sqlx::types::Json(shared::models::RuleActionSpec {
            action: req.action,
            category: req.action_category,
            priority: req.action_priority,
            highlight: req.action_highlight,
        }),
        is_active: true,
        created_at: chrono::Utc::now(),
    };
    let created = state.repos.user_rules.create(&rule).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.repos.user_rules.delete(id, user.user_id).await?;
    if !deleted {
        return Err(AppError::not_found("rule"));
    }
    Ok(StatusCode::NO_CONTENT)
}

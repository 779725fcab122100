//! Request/response DTOs for the HTTP surface (C10). Distinct from
//! `shared::types`, which holds the hub/bus wire envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Device, DeviceType, Notification, RuleAction, RuleConditions, RulePriority, RuleType, User, UserRule};
use shared::TokenPair;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self { id: u.id, email: u.email, created_at: u.created_at }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn new(pair: TokenPair, user: User) -> Self {
        Self { token: pair.token, refresh_token: pair.refresh_token, user: user.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self { token: pair.token, refresh_token: pair.refresh_token }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDeviceRequest {
    #[validate(length(min = 1, max = 255, message = "device_name must be 1-255 characters"))]
    pub device_name: String,
    pub device_type: DeviceType,
    pub push_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub device: Device,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub priority: Option<i16>,
    pub extras: Option<serde_json::Value>,
    pub client_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct NotificationActionRequest {
    pub action: ActionRequestKind,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionRequestKind {
    Read,
    Dismissed,
    Clicked,
}

#[derive(Debug, Deserialize)]
pub struct NotificationStatsQuery {
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct HistorySearchQuery {
    pub q: Option<String>,
    pub app_name: Option<String>,
    pub category: Option<String>,
    pub read_status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub rule_type: RuleType,
    pub priority: RulePriority,
    pub conditions: RuleConditions,
    pub action: RuleAction,
    pub action_category: Option<shared::models::Category>,
    pub action_priority: Option<i16>,
    pub action_highlight: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub rules: Vec<UserRule>,
}

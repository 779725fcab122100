//! Domain entities. These mirror the Postgres row shapes 1:1 via `FromRow`;
//! request/response DTOs live in `types`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Web,
    Desktop,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_name: String,
    pub device_type: DeviceType,
    pub push_token: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    Work,
    Personal,
    Junk,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Junk => "Junk",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_device_id: Uuid,
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub priority: i16,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub extras: Option<serde_json::Value>,
    pub client_id: Option<String>,
}

impl Notification {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Read,
    Dismissed,
    Clicked,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionRecord {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub device_id: Uuid,
    pub action: ActionKind,
    pub timestamp: DateTime<Utc>,
}

/// Evaluation-order priority. Distinct from `Notification::priority`
/// (an i16 in [0..3]) per the disjoint-meanings note in the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RulePriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    AppFilter,
    KeywordFilter,
    TimeBased,
    OtpAlways,
    PromoMute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Categorize,
    Mute,
    Prioritize,
    Highlight,
}

/// Tagged-variant conditions, keyed implicitly by `RuleType` (§9 dynamic
/// payloads note): carried as a concrete enum rather than a loose map so the
/// rule engine stays total over its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConditions {
    AppFilter { app_names: Vec<String> },
    KeywordFilter { keywords: Vec<String>, case_sensitive: bool, fields: KeywordFields },
    TimeBased { start_time: String, end_time: String, timezone: Option<String>, weekdays: Option<Vec<u8>> },
    OtpAlways {},
    PromoMute {},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordFields {
    Title,
    Body,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleActionSpec {
    pub action: RuleAction,
    pub category: Option<Category>,
    pub priority: Option<i16>,
    pub highlight: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    pub priority: RulePriority,
    #[sqlx(json)]
    pub conditions: sqlx::types::Json<RuleConditions>,
    #[sqlx(json)]
    pub actions: sqlx::types::Json<RuleActionSpec>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

//! Request/response DTOs, pagination, and the wire envelopes shared between
//! the WebSocket hub (C7) and the pub/sub bus (C4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl PaginationParams {
    /// Page size clamped to [1, 100]; page floored at 1.
    pub fn normalized(&self) -> (u32, u32) {
        let page = self.page.max(1);
        let page_size = self.page_size.clamp(1, 100);
        (page, page_size)
    }

    pub fn offset(&self) -> i64 {
        let (page, page_size) = self.normalized();
        ((page - 1) * page_size) as i64
    }

    pub fn limit(&self) -> i64 {
        self.normalized().1 as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, params: &PaginationParams, total: i64) -> Self {
        let (page, page_size) = params.normalized();
        let total_pages = if total == 0 {
            0
        } else {
            ((total as f64) / (page_size as f64)).ceil() as u32
        };
        Self {
            items,
            pagination: PaginationInfo { page, page_size, total, total_pages },
        }
    }
}

/// The envelope carried over both the WebSocket wire (§6) and the pub/sub
/// bus (§4.4) — the hub re-serializes bus envelopes verbatim to sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, data: serde_json::Value) -> Self {
        Self { kind, data, timestamp: Utc::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Ping,
    Pong,
    NewNotification,
    NotificationSync,
    NotificationUpdate,
    DeviceStatus,
    NotificationAction,
}

/// The bus-level message, published on channel `user:{user_id}` and
/// consumed by the hub's pattern subscriber to re-enter `BroadcastToUser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationActionKind {
    Read,
    Dismiss,
    Click,
}

//! Cache / presence / queue layer (C3): three cooperating services over a
//! single Redis connection with pipelined ops and TTLs.

use crate::{config::RedisConfig, error::AppError, Result};
use chrono::{DateTime, Utc};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub struct CacheTtl;

impl CacheTtl {
    pub const NOTIFICATION_STATUS: u64 = 7 * 24 * 3600;
    pub const USER_DEVICES: u64 = 30 * 24 * 3600;
    pub const DEVICE_CONNECTION: u64 = 5 * 60;
    pub const DEVICE_QUEUE: u64 = 7 * 24 * 3600;
    pub const DEVICE_QUEUE_CAP: isize = 1000;
}

pub struct CacheKeys;

impl CacheKeys {
    pub fn notification_status(id: Uuid) -> String {
        format!("notification:{id}:status")
    }
    pub fn user_devices(user_id: Uuid) -> String {
        format!("user:{user_id}:devices")
    }
    pub fn device_connection(device_id: Uuid) -> String {
        format!("device:{device_id}:connection")
    }
    pub fn device_queue(device_id: Uuid) -> String {
        format!("device:{device_id}:queue")
    }
    pub fn daily_digest(user_id: Uuid, date: &str) -> String {
        format!("daily_digest:{user_id}:{date}")
    }
    pub fn history_stats(user_id: Uuid, days: i64) -> String {
        format!("history_stats:{user_id}:{days}")
    }
    pub fn pubsub_channel(user_id: Uuid) -> String {
        format!("user:{user_id}")
    }
    pub fn pubsub_pattern() -> &'static str {
        "user:*"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStatus {
    pub id: Uuid,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConnection {
    pub device_id: Uuid,
    pub socket_id: Option<String>,
    pub last_ping: DateTime<Utc>,
    pub is_online: bool,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
}

#[derive(Clone)]
pub struct RedisService {
    connection: MultiplexedConnection,
}

impl RedisService {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        tracing::info!("connecting to redis at {}:{}", config.host, config.port);
        let client = Client::open(config.url())
            .map_err(|e| AppError::configuration(format!("invalid redis url: {e}")))?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| AppError::configuration(format!("failed to connect to redis: {e}")))?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    // ---- Status cache -------------------------------------------------

    /// Writes never silently overwrite a newer record with a stale one:
    /// the existing `updated_at` is the tiebreaker.
    pub async fn set_status(&self, status: &NotificationStatus) -> Result<()> {
        let key = CacheKeys::notification_status(status.id);
        if let Some(existing) = self.get_status(status.id).await? {
            if existing.updated_at > status.updated_at {
                return Ok(());
            }
        }
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(status)?;
        conn.set_ex::<_, _, ()>(&key, payload, CacheTtl::NOTIFICATION_STATUS).await?;
        Ok(())
    }

    pub async fn get_status(&self, id: Uuid) -> Result<Option<NotificationStatus>> {
        let key = CacheKeys::notification_status(id);
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(&key).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn batch_set_status(&self, statuses: &[NotificationStatus]) -> Result<()> {
        if statuses.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for status in statuses {
            let key = CacheKeys::notification_status(status.id);
            let payload = serde_json::to_string(status)?;
            pipe.set_ex(key, payload, CacheTtl::NOTIFICATION_STATUS);
        }
        let mut conn = self.connection.clone();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    // ---- Presence -------------------------------------------------------

    pub async fn add_user_device(&self, user_id: Uuid, device_id: Uuid) -> Result<()> {
        let key = CacheKeys::user_devices(user_id);
        let mut conn = self.connection.clone();
        conn.sadd::<_, _, ()>(&key, device_id.to_string()).await?;
        conn.expire::<_, ()>(&key, CacheTtl::USER_DEVICES as i64).await?;
        Ok(())
    }

    pub async fn set_connection(&self, conn_info: &DeviceConnection) -> Result<()> {
        let key = CacheKeys::device_connection(conn_info.device_id);
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(conn_info)?;
        conn.set_ex::<_, _, ()>(&key, payload, CacheTtl::DEVICE_CONNECTION).await?;
        Ok(())
    }

    /// Refreshes TTL; creates an online record if absent.
    pub async fn heartbeat(&self, device_id: Uuid) -> Result<()> {
        let key = CacheKeys::device_connection(device_id);
        let mut conn = self.connection.clone();
        let existing: Option<String> = conn.get(&key).await?;
        match existing {
            Some(raw) => {
                let mut stored: DeviceConnection = serde_json::from_str(&raw)?;
                stored.last_ping = Utc::now();
                stored.is_online = true;
                let payload = serde_json::to_string(&stored)?;
                conn.set_ex::<_, _, ()>(&key, payload, CacheTtl::DEVICE_CONNECTION).await?;
            }
            None => {
                self.set_connection(&DeviceConnection {
                    device_id,
                    socket_id: None,
                    last_ping: Utc::now(),
                    is_online: true,
                    user_agent: None,
                })
                .await?;
            }
        }
        Ok(())
    }

    pub async fn get_connection(&self, device_id: Uuid) -> Result<Option<DeviceConnection>> {
        let key = CacheKeys::device_connection(device_id);
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(&key).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn remove_connection(&self, device_id: Uuid) -> Result<()> {
        let key = CacheKeys::device_connection(device_id);
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }

    /// Intersects the user's device set with connections whose `last_ping`
    /// is within the 5-minute window (the TTL already expires stale
    /// entries, but a connection can still be present-but-stale for a few
    /// hundred ms during eventual consistency, so this re-checks).
    pub async fn online_devices_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let key = CacheKeys::user_devices(user_id);
        let mut conn = self.connection.clone();
        let device_ids: Vec<String> = conn.smembers(&key).await?;
        let window = chrono::Duration::seconds(CacheTtl::DEVICE_CONNECTION as i64);
        let now = Utc::now();
        let mut online = Vec::new();
        for raw_id in device_ids {
            let Ok(device_id) = Uuid::parse_str(&raw_id) else { continue };
            if let Some(conn_info) = self.get_connection(device_id).await? {
                if conn_info.is_online && now - conn_info.last_ping <= window {
                    online.push(device_id);
                }
            }
        }
        Ok(online)
    }

    // ---- Message queue --------------------------------------------------

    pub async fn enqueue(&self, device_id: Uuid, item: &QueueItem) -> Result<()> {
        let key = CacheKeys::device_queue(device_id);
        let payload = serde_json::to_string(item)?;
        let mut pipe = redis::pipe();
        pipe.lpush(&key, payload)
            .ltrim(&key, 0, CacheTtl::DEVICE_QUEUE_CAP - 1)
            .expire(&key, CacheTtl::DEVICE_QUEUE as i64);
        let mut conn = self.connection.clone();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    /// Read-then-delete, not an atomic per-message pop (documented open
    /// question in the design notes): a crash between the read and the
    /// delete can redeliver a batch. Callers dedupe by id+action+updated_at.
    pub async fn dequeue(&self, device_id: Uuid) -> Result<Vec<QueueItem>> {
        let key = CacheKeys::device_queue(device_id);
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.lrange(&key, 0, -1).await?;
        conn.del::<_, ()>(&key).await?;
        let mut items: Vec<QueueItem> =
            raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect();
        // LPUSH makes the list newest-first; dequeue should replay in
        // enqueue order, so reverse before handing back to the caller.
        items.reverse();
        Ok(items)
    }

    pub async fn peek(&self, device_id: Uuid, n: isize) -> Result<Vec<QueueItem>> {
        let key = CacheKeys::device_queue(device_id);
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.lrange(&key, 0, n.max(1) - 1).await?;
        Ok(raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect())
    }

    pub async fn queue_length(&self, device_id: Uuid) -> Result<i64> {
        let key = CacheKeys::device_queue(device_id);
        let mut conn = self.connection.clone();
        Ok(conn.llen(&key).await?)
    }

    pub async fn clear_queue(&self, device_id: Uuid) -> Result<()> {
        let key = CacheKeys::device_queue(device_id);
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }

    pub async fn purge_device(&self, device_id: Uuid) -> Result<()> {
        self.remove_connection(device_id).await?;
        self.clear_queue(device_id).await?;
        Ok(())
    }

    // ---- Generic JSON cache (digests, history stats) --------------------

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, payload, ttl_secs).await?;
        Ok(())
    }

    pub async fn get_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }
}

use crate::error::AppError;
use crate::models::{ActionKind, ActionRecord};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActionRecordRepository {
    pool: PgPool,
}

impl ActionRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append-only: duplicate records for the same logical action are
    /// acceptable (§8 round-trip/idempotence notes).
    pub async fn create(
        &self,
        notification_id: Uuid,
        device_id: Uuid,
        action: ActionKind,
    ) -> Result<ActionRecord> {
        sqlx::query_as::<_, ActionRecord>(
            r#"INSERT INTO action_records (id, notification_id, device_id, action, timestamp)
               VALUES (gen_random_uuid(), $1, $2, $3, now())
               RETURNING id, notification_id, device_id, action, timestamp"#,
        )
        .bind(notification_id)
        .bind(device_id)
        .bind(action)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn list_for_notification(&self, notification_id: Uuid) -> Result<Vec<ActionRecord>> {
        sqlx::query_as::<_, ActionRecord>(
            "SELECT id, notification_id, device_id, action, timestamp
             FROM action_records WHERE notification_id = $1 ORDER BY timestamp ASC",
        )
        .bind(notification_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn count_for_user_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM action_records ar
             JOIN notifications n ON n.id = ar.notification_id
             WHERE n.user_id = $1 AND ar.timestamp >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}

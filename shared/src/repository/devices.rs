use crate::error::AppError;
use crate::models::{Device, DeviceType};
use crate::Result;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        device_name: &str,
        device_type: DeviceType,
        push_token: Option<&str>,
    ) -> Result<Device> {
        sqlx::query_as::<_, Device>(
            r#"INSERT INTO devices (id, user_id, device_name, device_type, push_token, last_seen, created_at)
               VALUES (gen_random_uuid(), $1, $2, $3, $4, now(), now())
               RETURNING id, user_id, device_name, device_type, push_token, last_seen, created_at"#,
        )
        .bind(user_id)
        .bind(device_name)
        .bind(device_type)
        .bind(push_token)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Device>> {
        sqlx::query_as::<_, Device>(
            "SELECT id, user_id, device_name, device_type, push_token, last_seen, created_at
             FROM devices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Device>> {
        sqlx::query_as::<_, Device>(
            "SELECT id, user_id, device_name, device_type, push_token, last_seen, created_at
             FROM devices WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Step 2 of ingestion: verify device belongs to user.
    pub async fn belongs_to_user(&self, device_id: Uuid, user_id: Uuid) -> Result<bool> {
        let found = self.get_by_id(device_id).await?;
        Ok(found.map(|d| d.user_id == user_id).unwrap_or(false))
    }

    pub async fn touch_last_seen(&self, device_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE devices SET last_seen = now() WHERE id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn delete(&self, device_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}

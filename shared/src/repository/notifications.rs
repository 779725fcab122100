use crate::error::AppError;
use crate::models::{Category, Notification};
use crate::types::PaginationParams;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatusFilter {
    All,
    Read,
    Unread,
}

/// Combinable, logical-AND search filters (§4.9).
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub search: Option<String>,
    pub app_name: Option<String>,
    pub category: Option<Category>,
    pub read_status: Option<ReadStatusFilter>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = "id, user_id, source_device_id, app_name, title, body, category, \
    priority, is_read, is_dismissed, created_at, expires_at, extras, client_id";

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, n: &Notification) -> Result<Notification> {
        let query = format!(
            "INSERT INTO notifications ({SELECT_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
             RETURNING {SELECT_COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(n.id)
            .bind(n.user_id)
            .bind(n.source_device_id)
            .bind(&n.app_name)
            .bind(&n.title)
            .bind(&n.body)
            .bind(n.category)
            .bind(n.priority)
            .bind(n.is_read)
            .bind(n.is_dismissed)
            .bind(n.created_at)
            .bind(n.expires_at)
            .bind(&n.extras)
            .bind(&n.client_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Idempotency lookup: same `client_id` for this user within the last
    /// `window_seconds` returns the prior notification instead of inserting.
    pub async fn find_recent_by_client_id(
        &self,
        user_id: Uuid,
        client_id: &str,
        window_seconds: i64,
    ) -> Result<Option<Notification>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM notifications
             WHERE user_id = $1 AND client_id = $2
               AND created_at >= now() - ($3 || ' seconds')::interval
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(client_id)
            .bind(window_seconds.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
        paging: &PaginationParams,
    ) -> Result<(Vec<Notification>, i64)> {
        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM notifications WHERE user_id = ");
        count_builder.push_bind(user_id);
        Self::push_filter(&mut count_builder, filter);
        let total: (i64,) = count_builder.build_query_as().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE user_id = "
        ));
        builder.push_bind(user_id);
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(paging.limit());
        builder.push(" OFFSET ");
        builder.push_bind(paging.offset());

        let rows: Vec<Notification> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok((rows, total.0))
    }

    fn push_filter(builder: &mut QueryBuilder<sqlx::Postgres>, filter: &NotificationFilter) {
        if let Some(search) = &filter.search {
            builder.push(" AND (title ILIKE ");
            builder.push_bind(format!("%{search}%"));
            builder.push(" OR body ILIKE ");
            builder.push_bind(format!("%{search}%"));
            builder.push(")");
        }
        if let Some(app_name) = &filter.app_name {
            builder.push(" AND app_name = ");
            builder.push_bind(app_name.clone());
        }
        if let Some(category) = filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        match filter.read_status {
            Some(ReadStatusFilter::Read) => {
                builder.push(" AND is_read = true");
            }
            Some(ReadStatusFilter::Unread) => {
                builder.push(" AND is_read = false");
            }
            _ => {}
        }
        if let Some(start) = filter.start_date {
            builder.push(" AND created_at >= ");
            builder.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            builder.push(" AND created_at <= ");
            builder.push_bind(end);
        }
    }

    /// Applies a read/dismiss/click action's flag mutation.
    /// `is_dismissed ⇒ is_read` is enforced here as the single write path.
    pub async fn apply_action_flags(&self, id: Uuid, is_read: bool, is_dismissed: bool) -> Result<()> {
        let is_read = is_read || is_dismissed;
        sqlx::query(
            "UPDATE notifications SET is_read = $2, is_dismissed = $3
             WHERE id = $1 AND expires_at > now()",
        )
        .bind(id)
        .bind(is_read)
        .bind(is_dismissed)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn list_for_user_on_date(
        &self,
        user_id: Uuid,
        date: chrono::NaiveDate,
    ) -> Result<Vec<Notification>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM notifications
             WHERE user_id = $1 AND created_at::date = $2
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Notification>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM notifications
             WHERE user_id = $1 AND created_at >= $2
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn distinct_active_days(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT created_at::date) FROM notifications
             WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// `Notification.CleanupExpired()`: deletes rows past `expires_at`,
    /// returns the count for logging.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}

use crate::error::AppError;
use crate::models::User;
use crate::Result;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let existing = self.get_by_email(email).await?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("user with email '{email}' already exists")));
        }

        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, password_hash, created_at, updated_at)
               VALUES (gen_random_uuid(), $1, $2, now(), now())
               RETURNING id, email, password_hash, created_at, updated_at"#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::conflict(format!("user with email '{email}' already exists"))
            }
            other => AppError::from(other),
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }
}

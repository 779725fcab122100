use crate::error::AppError;
use crate::models::UserRule;
use crate::rules::order_rules_for_evaluation;
use crate::Result;
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "id, user_id, name, rule_type, priority, conditions, actions, is_active, created_at";

#[derive(Clone)]
pub struct UserRuleRepository {
    pool: PgPool,
}

impl UserRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, rule: &UserRule) -> Result<UserRule> {
        let query = format!(
            "INSERT INTO user_rules ({SELECT_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
             RETURNING {SELECT_COLUMNS}"
        );
        sqlx::query_as::<_, UserRule>(&query)
            .bind(rule.id)
            .bind(rule.user_id)
            .bind(&rule.name)
            .bind(rule.rule_type)
            .bind(rule.priority)
            .bind(&rule.conditions)
            .bind(&rule.actions)
            .bind(rule.is_active)
            .bind(rule.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Returns active rules pre-ordered for evaluation: descending
    /// priority, ties broken by creation time (older first).
    pub async fn list_active_ordered(&self, user_id: Uuid) -> Result<Vec<UserRule>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM user_rules WHERE user_id = $1 AND is_active = true"
        );
        let rules: Vec<UserRule> =
            sqlx::query_as::<_, UserRule>(&query).bind(user_id).fetch_all(&self.pool).await?;
        Ok(order_rules_for_evaluation(rules))
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<UserRule>> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM user_rules WHERE user_id = $1");
        sqlx::query_as::<_, UserRule>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_rules WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

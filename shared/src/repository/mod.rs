//! Repository contracts (C2): pure data access over Postgres, no business
//! validation. Each repository is implementable against any document store
//! with equality/range/in/substring filters and ordered pagination; nothing
//! here assumes SQL specifically beyond the concrete `sqlx` implementation.

pub mod action_records;
pub mod devices;
pub mod notifications;
pub mod user_rules;
pub mod users;

use crate::Result;
use sqlx::PgPool;

pub use action_records::ActionRecordRepository;
pub use devices::DeviceRepository;
pub use notifications::{NotificationFilter, NotificationRepository, ReadStatusFilter};
pub use user_rules::UserRuleRepository;
pub use users::UserRepository;

/// Bundles the five repositories behind a single handle so `AppState`
/// doesn't need five separate fields. Keeps its own pool handle too, used
/// only for the health-check endpoint's `SELECT 1`.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub devices: DeviceRepository,
    pub notifications: NotificationRepository,
    pub action_records: ActionRecordRepository,
    pub user_rules: UserRuleRepository,
    pool: PgPool,
}

impl Repositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            devices: DeviceRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            action_records: ActionRecordRepository::new(pool.clone()),
            user_rules: UserRuleRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    pub fn pool_idle(&self) -> usize {
        self.pool.num_idle()
    }
}

use shared::{AuthService, Bus, Config, RedisService, Repositories};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::hub::HubHandle;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub redis: RedisService,
    pub bus: Bus,
    pub auth: Arc<AuthService>,
    pub hub: HubHandle,
}

impl AppState {
    pub async fn new(config: Config, hub: HubHandle) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database.acquire_timeout_seconds,
            ))
            .connect(&config.database.uri)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let redis = RedisService::new(&config.redis).await?;
        let bus = Bus::new(&config.redis.url())?;
        let auth = Arc::new(AuthService::new(&config.auth));
        let repos = Repositories::new(pool);

        Ok(Self {
            config: Arc::new(config),
            repos,
            redis,
            bus,
            auth,
            hub,
        })
    }
}

//! Configuration loading. Field names track the normative configuration
//! names one-for-one; only the env var spelling is uppercased/snake_case.

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub pool_size: u32,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(pw) if !pw.is_empty() => {
                format!("redis://:{}@{}:{}/{}", pw, self.host, self.port, self.db)
            }
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_expiration_hours: u64,
    pub refresh_expiration_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub service_port: u16,
    pub cleanup_interval_hours: u64,
    pub digest_cache_hours: u64,
    pub top_notifications: usize,
    pub quiet_day_threshold: i64,
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let token_secret = env::var("TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("TOKEN_SECRET must be set"))?;
        let database_uri = env::var("DOCUMENT_STORE_URI")
            .map_err(|_| anyhow::anyhow!("DOCUMENT_STORE_URI must be set"))?;

        Ok(Config {
            database: DatabaseConfig {
                uri: database_uri,
                name: env::var("DOCUMENT_STORE_NAME").unwrap_or_else(|_| "notisync".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()?,
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                acquire_timeout_seconds: env::var("DATABASE_ACQUIRE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            redis: RedisConfig {
                host: env::var("KV_STORE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("KV_STORE_PORT")
                    .unwrap_or_else(|_| "6379".to_string())
                    .parse()?,
                password: env::var("KV_STORE_PASSWORD").ok().filter(|s| !s.is_empty()),
                db: env::var("KV_STORE_DB").unwrap_or_else(|_| "0".to_string()).parse()?,
                pool_size: env::var("KV_STORE_POOL_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                token_secret,
                token_expiration_hours: env::var("TOKEN_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()?,
                refresh_expiration_hours: env::var("REFRESH_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "720".to_string())
                    .parse()?,
            },
            app: AppConfig {
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                service_port: env::var("SERVICE_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()?,
                cleanup_interval_hours: env::var("CLEANUP_INTERVAL_HOURS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
                digest_cache_hours: env::var("DIGEST_CACHE_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()?,
                top_notifications: env::var("TOP_NOTIFICATIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                quiet_day_threshold: env::var("QUIET_DAY_THRESHOLD")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string()),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

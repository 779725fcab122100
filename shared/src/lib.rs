//! Shared library for the NotiSync server.
//!
//! Contains the parts of the core reusable outside the HTTP binary crate:
//! domain models, validation/classification/rule-engine logic, the error
//! taxonomy, configuration, auth, and the Postgres/Redis-backed
//! repository and cache implementations.

pub mod auth;
pub mod bus;
pub mod cache;
pub mod config;
pub mod error;
pub mod keywords;
pub mod models;
pub mod repository;
pub mod rules;
pub mod types;
pub mod validation;

pub use auth::{AuthService, Claims, TokenPair};
pub use bus::Bus;
pub use cache::RedisService;
pub use config::Config;
pub use error::{AppError, Result};
pub use models::*;
pub use repository::Repositories;
pub use types::*;

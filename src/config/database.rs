//! Postgres pool settings for the `users` table.
//!
//! The whole section is optional; without it the server keeps plan state in
//! memory.

use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` connection URL
    pub url: String,

    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,

    #[serde(default)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    #[serde(default = "DatabaseConfig::default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Apply pending migrations from `migrations_dir` before serving
    #[serde(default)]
    pub run_migrations: bool,

    #[serde(default = "DatabaseConfig::default_migrations_dir")]
    pub migrations_dir: String,
}

impl DatabaseConfig {
    fn default_max_connections() -> u32 {
        10
    }

    fn default_acquire_timeout_secs() -> u64 {
        5
    }

    fn default_migrations_dir() -> String {
        "migrations".to_string()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout())
    }

    /// Opens the pool, failing fast if the database is unreachable.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        self.pool_options().connect(&self.url).await
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let scheme_ok = ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));

        match () {
            _ if self.url.trim().is_empty() => Err(ValidationError::MissingRequired("DATABASE__URL")),
            _ if !scheme_ok => Err(ValidationError::InvalidDatabaseUrl),
            _ if self.max_connections == 0 || self.min_connections > self.max_connections => {
                Err(ValidationError::InvalidPoolSize)
            }
            _ if self.max_connections > MAX_POOL_SIZE => Err(ValidationError::PoolSizeTooLarge),
            _ => Ok(()),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: Self::default_max_connections(),
            min_connections: 0,
            acquire_timeout_secs: Self::default_acquire_timeout_secs(),
            run_migrations: false,
            migrations_dir: Self::default_migrations_dir(),
        }
    }
}

//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENTITLEMENT_SYNC` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod app_store;
mod database;
mod error;
mod google_play;
mod server;
mod stripe;
mod trust;

pub use app_store::AppStoreSettings;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use google_play::GooglePlaySettings;
pub use server::{Environment, ServerConfig};
pub use stripe::StripeSettings;
pub use trust::TrustSettings;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration. Without it users are kept in memory.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Web payment configuration (Stripe)
    pub stripe: StripeSettings,

    /// App Store Server API configuration
    pub app_store: AppStoreSettings,

    /// Google Play Developer API configuration
    pub google_play: GooglePlaySettings,

    /// Pinned roots for signed payloads
    #[serde(default)]
    pub trust: TrustSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ENTITLEMENT_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENT_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENTITLEMENT_SYNC__STRIPE__API_KEY=...` -> `stripe.api_key = ...`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("ENTITLEMENT_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.stripe.validate()?;
        self.app_store.validate()?;
        self.google_play.validate()?;
        self.trust.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

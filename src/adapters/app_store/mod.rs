//! App Store Server API adapters.
//!
//! - `AppStoreServerApi` - one environment, ES256-authenticated requests
//! - `FallbackAppStoreClient` - production lookup with sandbox fallback

mod app_store_api;
mod fallback;

pub use app_store_api::{AppStoreApiConfig, AppStoreServerApi};
pub use fallback::FallbackAppStoreClient;

//! Google Play adapters.
//!
//! - `BearerTokenCache` - service-account OAuth token, cached until near expiry
//! - `HttpTokenExchanger` - JWT-bearer grant against the token endpoint
//! - `GooglePlayDeveloperApi` - Android Publisher subscription lookups

mod bearer_token_cache;
mod developer_api;
mod token_exchanger;

pub use bearer_token_cache::{
    BearerTokenCache, ServiceAccountSigner, ANDROID_PUBLISHER_SCOPE, DEFAULT_TOKEN_URI,
    REFRESH_MARGIN_SECS,
};
pub use developer_api::GooglePlayDeveloperApi;
pub use token_exchanger::HttpTokenExchanger;

//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Web checkout provider
//! - `app_store` - App Store Server API
//! - `google_play` - Android Publisher API and OAuth token cache
//! - `postgres` / `memory` - User repositories
//! - `http` - REST endpoints

pub mod app_store;
pub mod google_play;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

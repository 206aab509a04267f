//! Entitlement Sync - Subscription entitlement reconciliation
//!
//! This crate keeps a user's plan consistent across three payment
//! ecosystems (web checkout, App Store, Google Play) by verifying provider
//! notifications and client receipts and folding them into one record.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

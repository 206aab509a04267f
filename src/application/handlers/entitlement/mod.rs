//! Entitlement handlers.
//!
//! Core services:
//! - `NotificationParser` decodes provider notifications into canonical decisions
//! - `EntitlementVerifier` re-derives a receipt's validity from the provider
//! - `ReconciliationEngine` applies decisions to user plan state
//!
//! ## Commands
//! - Processing provider notifications
//! - Verifying client-submitted store receipts
//! - Creating web checkout and billing portal sessions
//!
//! ## Queries
//! - Get subscription (syncing a completed web checkout)

mod checkout_fulfillment;
mod create_portal_session;
mod create_web_checkout;
mod entitlement_verifier;
mod get_subscription;
mod notification_parser;
mod process_notification;
mod reconciliation_engine;
mod verify_purchase;

// Services
pub use checkout_fulfillment::{CheckoutFulfillment, CheckoutFulfillmentLookup};
pub use entitlement_verifier::EntitlementVerifier;
pub use notification_parser::NotificationParser;
pub use reconciliation_engine::{Fulfillment, ReconciliationEngine, ReconciliationOutcome};

// Commands
pub use create_portal_session::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, CreatePortalSessionResult,
    PortalPlatform, PortalReturnUrls,
};
pub use create_web_checkout::{
    CreateWebCheckoutCommand, CreateWebCheckoutHandler, CreateWebCheckoutResult,
    DEFAULT_CHECKOUT_REDIRECT_URL,
};
pub use process_notification::{
    ProcessNotificationCommand, ProcessNotificationHandler, ProcessNotificationResult,
};
pub use verify_purchase::{
    VerifyPurchaseCommand, VerifyPurchaseHandler, VerifyPurchaseResult, MAX_RECEIPT_BYTES,
};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, GetSubscriptionResult};

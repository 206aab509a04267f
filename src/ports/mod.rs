//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Provider Ports
//!
//! - `WebPaymentProvider` - Web checkout provider (webhooks, sessions, customers)
//! - `AppStoreClient` - App Store Server API subscription statuses
//! - `PlayStoreClient` - Android Publisher subscription lookups
//! - `TokenExchanger` - OAuth JWT-bearer token endpoint
//!
//! ## Persistence Ports
//!
//! - `UserRepository` - Ownership lookup and plan writes

mod app_store_client;
mod payment_error;
mod play_store_client;
mod token_exchanger;
mod user_repository;
mod web_payment_provider;

pub use app_store_client::{
    AppStoreClient, AppStoreEnvironment, LastTransaction, NotificationData, NotificationPayload,
    RenewalInfo, SubscriptionGroupStatus, SubscriptionStatusResponse,
};
pub use payment_error::{PaymentError, PaymentErrorCode};
pub use play_store_client::{PlayStoreClient, SubscriptionPurchase};
pub use token_exchanger::{TokenExchanger, TokenGrant};
pub use user_repository::UserRepository;
pub use web_payment_provider::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutSessionInfo, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PortalSession, Subscription, SubscriptionStatus,
    WebPaymentProvider, WebhookEvent, WebhookEventData, WebhookEventType,
};

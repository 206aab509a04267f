//! Web payment provider port (Stripe-style checkout).
//!
//! Treated as an opaque RPC client: webhook verification, checkout and
//! subscription lookups, customer and session creation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

use super::PaymentError;

/// Port for the web checkout provider.
#[async_trait]
pub trait WebPaymentProvider: Send + Sync {
    /// Verify a webhook signature and parse the event.
    ///
    /// Returns an `InvalidWebhook` error if the signature does not verify.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;

    /// Retrieve a checkout session by id.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionInfo, PaymentError>;

    /// Retrieve a subscription by id.
    async fn retrieve_subscription(&self, subscription_id: &str)
        -> Result<Subscription, PaymentError>;

    /// Find the first customer registered with `email`.
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError>;

    /// Create a customer in the payment system.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Create a subscription-mode checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a billing portal session for subscription management.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Result<PortalSession, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user ID (stored as metadata).
    pub user_id: UserId,

    /// Customer email address, lower-cased.
    pub email: String,
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID.
    pub id: String,

    pub email: Option<String>,
}

/// Subscription in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
}

/// Subscription status from payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Statuses that mean a completed checkout should not be fulfilled.
    ///
    /// An old checkout session id can point at a subscription that has since
    /// been cancelled or never got going. Trials count here too since only
    /// paid subscriptions are sold.
    pub fn is_cancellation_pending(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Incomplete
                | SubscriptionStatus::IncompleteExpired
                | SubscriptionStatus::Trialing
                | SubscriptionStatus::Canceled
                | SubscriptionStatus::Paused
        )
    }
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// The parts of a checkout session needed for fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionInfo {
    pub id: String,
    pub payment_status: CheckoutPaymentStatus,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// `user_id` metadata set when the session was created.
    pub user_id: Option<String>,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Internal user ID, stored as session metadata.
    pub user_id: UserId,

    /// Provider's customer ID.
    pub customer_id: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after canceled checkout.
    pub cancel_url: String,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Portal session for subscription management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

/// Verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: WebhookEventType,
    pub data: WebhookEventData,
}

/// Types of webhook events we act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CheckoutSessionCompleted,
    SubscriptionDeleted,
    Unknown(String),
}

/// Webhook event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEventData {
    #[serde(rename = "checkout")]
    Checkout { session_id: String },

    #[serde(rename = "subscription")]
    Subscription {
        subscription_id: String,
        customer_id: String,
    },

    #[serde(rename = "raw")]
    Raw { json: String },
}

//! Stripe web payment provider adapter.
//!
//! Implements the `WebPaymentProvider` port for Stripe, including:
//! - Webhook signature verification
//! - Checkout session and subscription lookups
//! - Customer, checkout and billing portal session creation
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::{MethodCall, MockWebPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter, USER_ID_METADATA_KEY};
pub use webhook_types::{
    Expandable, SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeCustomer,
    StripeSubscription, StripeWebhookEvent,
};

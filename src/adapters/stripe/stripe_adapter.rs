//! Stripe web payment provider adapter.
//!
//! Implements the `WebPaymentProvider` trait against the Stripe REST API.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::entitlement::PaymentSource;
use crate::ports::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutSessionInfo, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PaymentError, PaymentErrorCode, PortalSession, Subscription,
    SubscriptionStatus, WebPaymentProvider, WebhookEvent, WebhookEventData, WebhookEventType,
};

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeCustomer, StripeList, StripePortalSession,
    StripeSubscription, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Metadata key carrying the internal user id on customers and sessions.
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Price sold by checkout sessions.
    price_id: String,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        price_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            price_id: price_id.into(),
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe web payment adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256.
    fn verify_signature(&self, payload: &[u8], header: &SignatureHeader) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::invalid_webhook(e.to_string()))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected.as_slice().ct_eq(provided).into());

        if !matched {
            tracing::warn!("Invalid webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Stripe event and convert to port types.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        let (event_type, data) = match stripe_event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession =
                    serde_json::from_value(stripe_event.data.object.clone()).map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid checkout session: {}", e))
                    })?;
                (
                    WebhookEventType::CheckoutSessionCompleted,
                    WebhookEventData::Checkout {
                        session_id: session.id,
                    },
                )
            }
            "customer.subscription.deleted" => {
                let sub: StripeSubscription =
                    serde_json::from_value(stripe_event.data.object.clone()).map_err(|e| {
                        PaymentError::invalid_webhook(format!("Invalid subscription: {}", e))
                    })?;
                (
                    WebhookEventType::SubscriptionDeleted,
                    WebhookEventData::Subscription {
                        subscription_id: sub.id,
                        customer_id: sub.customer.id().to_string(),
                    },
                )
            }
            other => (
                WebhookEventType::Unknown(other.to_string()),
                WebhookEventData::Raw {
                    json: stripe_event.data.object.to_string(),
                },
            ),
        };

        Ok(WebhookEvent {
            id: stripe_event.id,
            event_type,
            data,
        })
    }

    /// Sends an authenticated request and parses the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, PaymentError> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(PaymentSource::Web, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(operation, %status, error = %error_text, "Stripe request failed");
            let code = match status {
                StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PaymentErrorCode::AuthenticationError
                }
                StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
                s if s.is_server_error() => PaymentErrorCode::NetworkError,
                _ => PaymentErrorCode::ProviderError,
            };
            return Err(PaymentError::new(
                PaymentSource::Web,
                code,
                format!("Stripe API error: {}", error_text),
            )
            .with_provider_code(status.as_str()));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(
                PaymentSource::Web,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }
}

fn subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "past_due" => SubscriptionStatus::PastDue,
        "unpaid" => SubscriptionStatus::Unpaid,
        "canceled" => SubscriptionStatus::Canceled,
        "incomplete" => SubscriptionStatus::Incomplete,
        "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
        "trialing" => SubscriptionStatus::Trialing,
        "paused" => SubscriptionStatus::Paused,
        _ => SubscriptionStatus::Unknown,
    }
}

fn checkout_session_info(session: StripeCheckoutSession) -> CheckoutSessionInfo {
    let payment_status = match session.payment_status.as_str() {
        "paid" => CheckoutPaymentStatus::Paid,
        "no_payment_required" => CheckoutPaymentStatus::NoPaymentRequired,
        _ => CheckoutPaymentStatus::Unpaid,
    };

    CheckoutSessionInfo {
        customer_id: session.customer.as_ref().map(|c| c.id().to_string()),
        subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
        user_id: session.metadata.get(USER_ID_METADATA_KEY).cloned(),
        payment_status,
        id: session.id,
    }
}

#[async_trait]
impl WebPaymentProvider for StripePaymentAdapter {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;

        let webhook_event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %webhook_event.id,
            event_type = ?webhook_event.event_type,
            "Webhook signature verified"
        );

        Ok(webhook_event)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionInfo, PaymentError> {
        let request = self
            .http_client
            .get(self.url(&format!("/v1/checkout/sessions/{}", session_id)));
        let session: StripeCheckoutSession = self.send(request, "retrieve_checkout_session").await?;
        Ok(checkout_session_info(session))
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let request = self
            .http_client
            .get(self.url(&format!("/v1/subscriptions/{}", subscription_id)));
        let sub: StripeSubscription = self.send(request, "retrieve_subscription").await?;

        Ok(Subscription {
            customer_id: sub.customer.id().to_string(),
            status: subscription_status(&sub.status),
            id: sub.id,
        })
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        let request = self
            .http_client
            .get(self.url("/v1/customers"))
            .query(&[("email", email), ("limit", "1")]);
        let list: StripeList<StripeCustomer> = self.send(request, "list_customers").await?;

        Ok(list
            .data
            .into_iter()
            .find(|customer| !customer.deleted)
            .map(|customer| Customer {
                id: customer.id,
                email: customer.email,
            }))
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let params = [
            ("email".to_string(), request.email.clone()),
            (
                format!("metadata[{}]", USER_ID_METADATA_KEY),
                request.user_id.to_string(),
            ),
        ];
        let builder = self.http_client.post(self.url("/v1/customers")).form(&params);
        let customer: StripeCustomer = self.send(builder, "create_customer").await?;

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(Some(request.email)),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = [
            ("mode".to_string(), "subscription".to_string()),
            ("customer".to_string(), request.customer_id),
            ("line_items[0][price]".to_string(), self.config.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("customer_update[address]".to_string(), "auto".to_string()),
            ("automatic_tax[enabled]".to_string(), "true".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            (
                format!("metadata[{}]", USER_ID_METADATA_KEY),
                request.user_id.to_string(),
            ),
        ];
        let builder = self
            .http_client
            .post(self.url("/v1/checkout/sessions"))
            .form(&params);
        let session: StripeCheckoutSession = self.send(builder, "create_checkout_session").await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider(PaymentSource::Web, "No session URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Result<PortalSession, PaymentError> {
        let mut params = vec![("customer", customer_id)];
        if let Some(return_url) = return_url {
            params.push(("return_url", return_url));
        }
        let builder = self
            .http_client
            .post(self.url("/v1/billing_portal/sessions"))
            .form(&params);
        let portal: StripePortalSession = self.send(builder, "create_portal_session").await?;

        Ok(PortalSession {
            id: portal.id,
            url: portal.url,
        })
    }
}

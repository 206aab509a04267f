//! Mock web payment provider for testing.
//!
//! Provides a configurable implementation of `WebPaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured checkout sessions, subscriptions and customers
//! - Error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::entitlement::PaymentSource;
use crate::ports::{
    CheckoutPaymentStatus, CheckoutSession, CheckoutSessionInfo, CreateCheckoutRequest,
    CreateCustomerRequest, Customer, PaymentError, PortalSession, Subscription,
    SubscriptionStatus, WebPaymentProvider, WebhookEvent, WebhookEventData, WebhookEventType,
};

/// Mock web payment provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockWebPaymentProvider::new();
/// mock.add_checkout_session(MockWebPaymentProvider::paid_session("cs_1", "user-1", "cus_1"));
/// mock.set_method_error("retrieve_subscription", PaymentError::network(PaymentSource::Web, "down"));
/// ```
#[derive(Default)]
pub struct MockWebPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    checkout_sessions: HashMap<String, CheckoutSessionInfo>,
    subscriptions: HashMap<String, Subscription>,
    customers: Vec<Customer>,

    /// Event returned by the next successful `verify_webhook`.
    next_webhook_event: Option<WebhookEvent>,
    reject_webhooks: bool,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
    sequence: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockWebPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all webhook verifications.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().reject_webhooks = true;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_checkout_session(&self, session: CheckoutSessionInfo) {
        let id = session.id.clone();
        self.inner.lock().unwrap().checkout_sessions.insert(id, session);
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        let id = subscription.id.clone();
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(id, subscription);
    }

    pub fn add_customer(&self, customer: Customer) {
        self.inner.lock().unwrap().customers.push(customer);
    }

    /// Set the webhook event to return on verification.
    pub fn set_webhook_event(&self, event: WebhookEvent) {
        self.inner.lock().unwrap().next_webhook_event = Some(event);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        match self.inner.lock().unwrap().method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.inner.lock().unwrap();
        state.sequence += 1;
        format!("{}_mock_{}", prefix, state.sequence)
    }
}

impl Clone for MockWebPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl WebPaymentProvider for MockWebPaymentProvider {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        self.record_call("verify_webhook", vec![signature.to_string()]);
        self.check_error("verify_webhook")?;

        let mut state = self.inner.lock().unwrap();
        if state.reject_webhooks {
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        match state.next_webhook_event.take() {
            Some(event) => Ok(event),
            None => Ok(WebhookEvent {
                id: "evt_mock".to_string(),
                event_type: WebhookEventType::Unknown("mock".to_string()),
                data: WebhookEventData::Raw {
                    json: String::from_utf8_lossy(payload).to_string(),
                },
            }),
        }
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionInfo, PaymentError> {
        self.record_call("retrieve_checkout_session", vec![session_id.to_string()]);
        self.check_error("retrieve_checkout_session")?;

        self.inner
            .lock()
            .unwrap()
            .checkout_sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found(PaymentSource::Web, "Checkout session"))
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        self.record_call("retrieve_subscription", vec![subscription_id.to_string()]);
        self.check_error("retrieve_subscription")?;

        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found(PaymentSource::Web, "Subscription"))
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        self.record_call("find_customer_by_email", vec![email.to_string()]);
        self.check_error("find_customer_by_email")?;

        Ok(self
            .inner
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.user_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let customer = Customer {
            id: self.next_id("cus"),
            email: Some(request.email),
        };
        self.inner.lock().unwrap().customers.push(customer.clone());

        Ok(customer)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.user_id.to_string(),
                request.customer_id.clone(),
                request.success_url.clone(),
                request.cancel_url.clone(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let id = self.next_id("cs");
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: Option<&str>,
    ) -> Result<PortalSession, PaymentError> {
        self.record_call(
            "create_portal_session",
            vec![
                customer_id.to_string(),
                return_url.unwrap_or_default().to_string(),
            ],
        );
        self.check_error("create_portal_session")?;

        let id = self.next_id("bps");
        Ok(PortalSession {
            url: format!("https://billing.stripe.com/p/session/{}", id),
            id,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Test Helpers
// ════════════════════════════════════════════════════════════════════════════════

impl MockWebPaymentProvider {
    /// A paid checkout session carrying user metadata and a subscription.
    pub fn paid_session(session_id: &str, user_id: &str, customer_id: &str) -> CheckoutSessionInfo {
        CheckoutSessionInfo {
            id: session_id.to_string(),
            payment_status: CheckoutPaymentStatus::Paid,
            customer_id: Some(customer_id.to_string()),
            subscription_id: Some(format!("sub_for_{}", session_id)),
            user_id: Some(user_id.to_string()),
        }
    }

    /// Create a mock holding `session` and its subscription in `status`.
    pub fn with_session(session: CheckoutSessionInfo, status: SubscriptionStatus) -> Self {
        let mock = Self::new();
        if let (Some(subscription_id), Some(customer_id)) =
            (session.subscription_id.clone(), session.customer_id.clone())
        {
            mock.add_subscription(Subscription {
                id: subscription_id,
                customer_id,
                status,
            });
        }
        mock.add_checkout_session(session);
        mock
    }

    pub fn checkout_completed_event(session_id: &str) -> WebhookEvent {
        WebhookEvent {
            id: format!("evt_checkout_{}", session_id),
            event_type: WebhookEventType::CheckoutSessionCompleted,
            data: WebhookEventData::Checkout {
                session_id: session_id.to_string(),
            },
        }
    }

    pub fn subscription_deleted_event(customer_id: &str, subscription_id: &str) -> WebhookEvent {
        WebhookEvent {
            id: format!("evt_deleted_{}", subscription_id),
            event_type: WebhookEventType::SubscriptionDeleted,
            data: WebhookEventData::Subscription {
                subscription_id: subscription_id.to_string(),
                customer_id: customer_id.to_string(),
            },
        }
    }
}

//! Resolves whether a completed web checkout should grant premium.

use std::sync::Arc;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::{ExternalId, UserId, ValidationError};
use crate::ports::{CheckoutPaymentStatus, WebPaymentProvider};

/// Who a fulfillable checkout session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFulfillment {
    pub user_id: UserId,
    pub customer_id: ExternalId,
}

pub struct CheckoutFulfillmentLookup {
    provider: Arc<dyn WebPaymentProvider>,
}

impl CheckoutFulfillmentLookup {
    pub fn new(provider: Arc<dyn WebPaymentProvider>) -> Self {
        Self { provider }
    }

    /// Returns `None` when the session is unknown, unpaid, or its
    /// subscription has been cancelled since checkout.
    pub async fn lookup(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutFulfillment>, EntitlementError> {
        let session = match self.provider.retrieve_checkout_session(session_id).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(session_id, error = %err, "Failed to retrieve checkout session");
                return Ok(None);
            }
        };

        // An old session id can point at a subscription cancelled since.
        let cancellation_pending = match &session.subscription_id {
            Some(subscription_id) => self
                .provider
                .retrieve_subscription(subscription_id)
                .await?
                .status
                .is_cancellation_pending(),
            None => false,
        };

        if session.payment_status == CheckoutPaymentStatus::Unpaid || cancellation_pending {
            tracing::info!(
                session_id,
                payment_status = ?session.payment_status,
                cancellation_pending,
                "Checkout session not fulfillable"
            );
            return Ok(None);
        }

        let (Some(user_id), Some(customer_id)) = (session.user_id, session.customer_id) else {
            return Err(ValidationError::invalid_format(
                "checkout_session",
                "missing user_id or customer during checkout session fulfillment",
            )
            .into());
        };

        Ok(Some(CheckoutFulfillment {
            user_id: UserId::new(user_id)?,
            customer_id: ExternalId::new(customer_id)?,
        }))
    }
}

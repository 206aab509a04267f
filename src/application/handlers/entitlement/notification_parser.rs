//! NotificationParser - Turns provider notifications into canonical decisions.
//!
//! Each path returns `Ok(None)` for messages that are well-formed but carry
//! nothing to act on. Authentication failures and malformed payloads are
//! errors.

use std::sync::Arc;

use crate::domain::entitlement::{
    decode_android_envelope, CanonicalNotification, EntitlementError, InboundNotification,
    PaymentSource,
};
use crate::domain::foundation::{ExternalId, Timestamp, ValidationError};
use crate::domain::trust::SignedPayloadVerifier;
use crate::ports::{
    NotificationPayload, PlayStoreClient, RenewalInfo, WebPaymentProvider, WebhookEventData,
    WebhookEventType,
};

use super::CheckoutFulfillmentLookup;

pub struct NotificationParser {
    web: Arc<dyn WebPaymentProvider>,
    checkout: CheckoutFulfillmentLookup,
    signed_payloads: Arc<SignedPayloadVerifier>,
    play_store: Arc<dyn PlayStoreClient>,
    bundle_id: String,
}

impl NotificationParser {
    pub fn new(
        web: Arc<dyn WebPaymentProvider>,
        signed_payloads: Arc<SignedPayloadVerifier>,
        play_store: Arc<dyn PlayStoreClient>,
        bundle_id: impl Into<String>,
    ) -> Self {
        Self {
            checkout: CheckoutFulfillmentLookup::new(web.clone()),
            web,
            signed_payloads,
            play_store,
            bundle_id: bundle_id.into(),
        }
    }

    pub async fn parse(
        &self,
        inbound: &InboundNotification,
    ) -> Result<Option<CanonicalNotification>, EntitlementError> {
        match inbound {
            InboundNotification::Web { payload, signature } => {
                self.parse_web(payload, signature).await
            }
            InboundNotification::Ios { signed_payload } => self.parse_ios(signed_payload),
            InboundNotification::Android { data } => self.parse_android(data).await,
            InboundNotification::Unrecognized => Ok(None),
        }
    }

    pub async fn parse_web(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<Option<CanonicalNotification>, EntitlementError> {
        let event = self
            .web
            .verify_webhook(payload.as_bytes(), signature)
            .await?;

        match (&event.event_type, &event.data) {
            (
                WebhookEventType::SubscriptionDeleted,
                WebhookEventData::Subscription { customer_id, .. },
            ) => {
                tracing::info!(customer_id = %customer_id, "Subscription deleted");
                Ok(Some(CanonicalNotification::cancel(
                    PaymentSource::Web,
                    ExternalId::new(customer_id.as_str())?,
                )))
            }
            (
                WebhookEventType::CheckoutSessionCompleted,
                WebhookEventData::Checkout { session_id },
            ) => Ok(self.checkout.lookup(session_id).await?.map(|fulfillment| {
                CanonicalNotification::fulfill(PaymentSource::Web, fulfillment.customer_id)
                    .with_user(fulfillment.user_id)
            })),
            (event_type, _) => {
                tracing::info!(event_id = %event.id, ?event_type, "Unhandled web event type");
                Ok(None)
            }
        }
    }

    pub fn parse_ios(
        &self,
        signed_payload: &str,
    ) -> Result<Option<CanonicalNotification>, EntitlementError> {
        let payload: NotificationPayload = self.signed_payloads.verify(signed_payload)?;

        let data = payload.data.unwrap_or_default();
        let bundle_id = data.bundle_id.unwrap_or_default();
        if bundle_id != self.bundle_id {
            tracing::warn!(bundle_id = %bundle_id, "App Store notification for another bundle");
            return Err(ValidationError::invalid_format(
                "bundleId",
                format!("invalid bundle id '{}'", bundle_id),
            )
            .into());
        }

        let Some(signed_renewal_info) = data.signed_renewal_info else {
            tracing::info!(
                notification_type = ?payload.notification_type,
                "App Store notification without renewal info"
            );
            return Ok(None);
        };

        let renewal: RenewalInfo = self.signed_payloads.verify(&signed_renewal_info)?;

        Ok(Some(CanonicalNotification::from_activity(
            renewal.is_active(),
            PaymentSource::Ios,
            ExternalId::new(renewal.original_transaction_id)?,
        )))
    }

    pub async fn parse_android(
        &self,
        data: &str,
    ) -> Result<Option<CanonicalNotification>, EntitlementError> {
        let Some(notice) = decode_android_envelope(data)? else {
            tracing::info!("Play notification without a subscription notice");
            return Ok(None);
        };

        let purchase = self
            .play_store
            .get_subscription(&notice.subscription_id, &notice.purchase_token)
            .await?;

        Ok(Some(CanonicalNotification::from_activity(
            purchase.is_entitlement_active(Timestamp::now()),
            PaymentSource::Android,
            ExternalId::new(notice.purchase_token)?,
        )))
    }
}

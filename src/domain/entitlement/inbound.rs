//! Classification of raw notification deliveries.
//!
//! The three provider wire shapes never overlap, so the first structural
//! match wins:
//!
//! 1. a web signature header is present,
//! 2. the body has a string `signedPayload` (App Store),
//! 3. the body has a string `message.data` (Play Store Pub/Sub push).

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::{store_identifier, ValidationError};

/// One inbound delivery, tagged by provider shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundNotification {
    Web { payload: String, signature: String },
    Ios { signed_payload: String },
    Android { data: String },
    Unrecognized,
}

impl InboundNotification {
    /// Classifies a delivery from its signature header and raw body.
    ///
    /// A body that is not JSON is a validation error unless a web signature
    /// header is present, since web payloads are verified byte for byte.
    /// Callers acknowledge such bodies as invalid rather than failing the
    /// delivery.
    pub fn classify(signature: Option<&str>, body: &str) -> Result<Self, ValidationError> {
        if let Some(signature) = signature.filter(|s| !s.is_empty()) {
            return Ok(InboundNotification::Web {
                payload: body.to_string(),
                signature: signature.to_string(),
            });
        }

        let json: Value = serde_json::from_str(body)
            .map_err(|e| ValidationError::invalid_format("notification", e.to_string()))?;

        if let Some(signed_payload) = json.get("signedPayload").and_then(Value::as_str) {
            return Ok(InboundNotification::Ios {
                signed_payload: signed_payload.to_string(),
            });
        }

        if let Some(data) = json
            .get("message")
            .and_then(|message| message.get("data"))
            .and_then(Value::as_str)
        {
            return Ok(InboundNotification::Android {
                data: data.to_string(),
            });
        }

        Ok(InboundNotification::Unrecognized)
    }

    /// Short provider label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundNotification::Web { .. } => "web",
            InboundNotification::Ios { .. } => "ios",
            InboundNotification::Android { .. } => "android",
            InboundNotification::Unrecognized => "unrecognized",
        }
    }
}

/// The subscription part of a Play Store developer notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionNotice {
    pub purchase_token: String,
    pub subscription_id: String,
}

#[derive(Deserialize)]
struct DeveloperNotification {
    #[serde(rename = "subscriptionNotification")]
    subscription_notification: Option<Value>,
}

/// Decodes the base64 `message.data` envelope.
///
/// Returns `Ok(None)` when the envelope carries no subscription notification
/// (test pings, one-time products) or its fields are not strings.
pub fn decode_android_envelope(data: &str) -> Result<Option<SubscriptionNotice>, ValidationError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| ValidationError::invalid_format("message.data", e.to_string()))?;
    let envelope: DeveloperNotification = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::invalid_format("message.data", e.to_string()))?;

    let Some(notice) = envelope.subscription_notification else {
        return Ok(None);
    };
    let purchase_token = notice.get("purchaseToken").and_then(Value::as_str);
    let subscription_id = notice.get("subscriptionId").and_then(Value::as_str);

    Ok(match (purchase_token, subscription_id) {
        (Some(purchase_token), Some(subscription_id)) => Some(SubscriptionNotice {
            purchase_token: store_identifier("purchaseToken", purchase_token)?.to_string(),
            subscription_id: store_identifier("subscriptionId", subscription_id)?.to_string(),
        }),
        _ => None,
    })
}

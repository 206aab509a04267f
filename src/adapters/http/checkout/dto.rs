//! HTTP DTOs for checkout and subscription endpoints.
//!
//! Field names are camelCase to match the mobile and web clients.

use serde::{Deserialize, Serialize};

use crate::application::handlers::entitlement::GetSubscriptionResult;
use crate::domain::entitlement::{EntitlementRecord, PaymentSource, PlanInterval, PlanKeyname};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Receipt submitted by a mobile client after an in-app purchase.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPurchaseRequest {
    /// `ios` or `android`.
    pub iap_source: String,
    pub transaction_receipt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQueryParams {
    #[serde(default)]
    pub checkout_session_id: Option<String>,
}

/// Request for a billing portal session.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalRequest {
    /// `app` or `web`, selecting the return URL.
    pub platform: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgment for a provider notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled: Option<bool>,
}

impl NotificationResponse {
    pub fn handled() -> Self {
        Self {
            valid: true,
            handled: None,
        }
    }

    pub fn unhandled() -> Self {
        Self {
            valid: true,
            handled: Some(false),
        }
    }

    pub fn malformed() -> Self {
        Self {
            valid: false,
            handled: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub plan_keyname: PlanKeyname,
    pub plan_interval: PlanInterval,
}

impl From<&EntitlementRecord> for PlanResponse {
    fn from(record: &EntitlementRecord) -> Self {
        Self {
            plan_keyname: record.plan_keyname,
            plan_interval: record.plan_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPurchaseResponse {
    pub valid: bool,
    pub subscription: PlanResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub valid: bool,
    pub iap_source: Option<PaymentSource>,
    pub subscription: PlanResponse,
}

impl From<GetSubscriptionResult> for SubscriptionResponse {
    fn from(result: GetSubscriptionResult) -> Self {
        Self {
            valid: true,
            iap_source: result.source,
            subscription: PlanResponse {
                plan_keyname: result.plan_keyname,
                plan_interval: result.plan_interval,
            },
        }
    }
}

/// A provider-hosted page the client should open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectResponse {
    pub valid: bool,
    pub url: String,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub valid: bool,
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_code: error_code.into(),
            error: error.into(),
        }
    }
}

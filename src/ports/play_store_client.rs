//! Play Store (Android Publisher) subscription port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::PaymentError;

/// Port for `purchases.subscriptions.get`.
#[async_trait]
pub trait PlayStoreClient: Send + Sync {
    async fn get_subscription(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionPurchase, PaymentError>;
}

/// Subset of the Android Publisher `SubscriptionPurchase` resource.
///
/// Millisecond timestamps arrive as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPurchase {
    #[serde(default)]
    pub start_time_millis: Option<String>,
    #[serde(default)]
    pub expiry_time_millis: Option<String>,
    #[serde(default)]
    pub auto_renewing: Option<bool>,
    #[serde(default)]
    pub payment_state: Option<i32>,
    #[serde(default)]
    pub cancel_reason: Option<i32>,
    #[serde(default)]
    pub order_id: Option<String>,
}

impl SubscriptionPurchase {
    pub fn expiry(&self) -> Option<Timestamp> {
        self.expiry_time_millis
            .as_deref()
            .and_then(|millis| millis.parse::<i64>().ok())
            .and_then(Timestamp::from_unix_millis)
    }

    /// Entitlement holds until expiry, including a cancelled-but-paid period.
    pub fn is_entitlement_active(&self, now: Timestamp) -> bool {
        self.expiry().is_some_and(|expiry| expiry.is_after(&now))
    }
}

//! App Store Server API port and its signed payload shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PaymentError;

/// App Store environment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStoreEnvironment {
    Production,
    Sandbox,
}

/// Port for the "Get All Subscription Statuses" endpoint.
#[async_trait]
pub trait AppStoreClient: Send + Sync {
    async fn get_subscription_statuses(
        &self,
        transaction_id: &str,
    ) -> Result<SubscriptionStatusResponse, PaymentError>;
}

/// Response of `GET /inApps/v1/subscriptions/{transactionId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    #[serde(default)]
    pub data: Vec<SubscriptionGroupStatus>,
}

impl SubscriptionStatusResponse {
    /// Finds the latest transaction of `original_transaction_id` in any group.
    pub fn find_transaction(&self, original_transaction_id: &str) -> Option<&LastTransaction> {
        self.data
            .iter()
            .flat_map(|group| group.last_transactions.iter())
            .find(|tx| tx.original_transaction_id == original_transaction_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionGroupStatus {
    #[serde(default)]
    pub subscription_group_identifier: Option<String>,
    #[serde(default)]
    pub last_transactions: Vec<LastTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastTransaction {
    pub original_transaction_id: String,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub signed_transaction_info: Option<String>,
    pub signed_renewal_info: String,
}

/// Decoded payload of a signed renewal-info token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfo {
    pub original_transaction_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub auto_renew_status: Option<i32>,
    /// Present once the subscription has expired or will not renew.
    #[serde(default)]
    pub expiration_intent: Option<i32>,
}

impl RenewalInfo {
    pub fn is_active(&self) -> bool {
        self.expiration_intent.is_none()
    }
}

/// Decoded payload of an App Store Server Notification (v2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub signed_transaction_info: Option<String>,
    #[serde(default)]
    pub signed_renewal_info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_store_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn AppStoreClient) {}
    }

    #[test]
    fn find_transaction_searches_all_groups() {
        let response: SubscriptionStatusResponse = serde_json::from_value(serde_json::json!({
            "environment": "Production",
            "data": [
                { "subscriptionGroupIdentifier": "g1", "lastTransactions": [
                    { "originalTransactionId": "111", "status": 1, "signedRenewalInfo": "a" }
                ]},
                { "subscriptionGroupIdentifier": "g2", "lastTransactions": [
                    { "originalTransactionId": "222", "status": 2, "signedRenewalInfo": "b" }
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(response.find_transaction("222").unwrap().signed_renewal_info, "b");
        assert!(response.find_transaction("333").is_none());
    }

    #[test]
    fn renewal_info_without_expiration_intent_is_active() {
        let info: RenewalInfo =
            serde_json::from_str(r#"{"originalTransactionId":"1","autoRenewStatus":1}"#).unwrap();
        assert!(info.is_active());

        let info: RenewalInfo =
            serde_json::from_str(r#"{"originalTransactionId":"1","expirationIntent":1}"#).unwrap();
        assert!(!info.is_active());
    }
}

//! EntitlementVerifier - Re-derives a client receipt's validity from the provider.
//!
//! The receipt only locates the purchase. Whether it grants premium is
//! always decided from the provider's live subscription status.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::entitlement::{EntitlementError, PaymentSource};
use crate::domain::foundation::{store_identifier, ExternalId, Timestamp, ValidationError};
use crate::domain::trust::SignedPayloadVerifier;
use crate::ports::{AppStoreClient, PlayStoreClient, RenewalInfo};

pub struct EntitlementVerifier {
    app_store: Arc<dyn AppStoreClient>,
    play_store: Arc<dyn PlayStoreClient>,
    signed_payloads: Arc<SignedPayloadVerifier>,
    android_product_id: Option<String>,
}

impl EntitlementVerifier {
    pub fn new(
        app_store: Arc<dyn AppStoreClient>,
        play_store: Arc<dyn PlayStoreClient>,
        signed_payloads: Arc<SignedPayloadVerifier>,
    ) -> Self {
        Self {
            app_store,
            play_store,
            signed_payloads,
            android_product_id: None,
        }
    }

    /// Looks Play subscriptions up under this product instead of the
    /// receipt's own `productId`.
    pub fn with_android_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.android_product_id = Some(product_id.into());
        self
    }

    /// Returns the external id to reconcile when the receipt is active.
    pub async fn verify(
        &self,
        source: PaymentSource,
        receipt: &str,
    ) -> Result<ExternalId, EntitlementError> {
        let receipt = parse_receipt(receipt)?;
        match source {
            PaymentSource::Ios => self.verify_ios(&receipt).await,
            PaymentSource::Android => self.verify_android(&receipt).await,
            PaymentSource::Web => Err(ValidationError::invalid_format(
                "iapSource",
                "web purchases are not verified from receipts",
            )
            .into()),
        }
    }

    async fn verify_ios(&self, receipt: &Map<String, Value>) -> Result<ExternalId, EntitlementError> {
        let transaction_id = string_field(receipt, "originalTransactionId")
            .or_else(|| string_field(receipt, "transactionId"))
            .ok_or_else(|| ValidationError::empty_field("originalTransactionId"))?;
        let transaction_id = store_identifier("originalTransactionId", transaction_id)?;

        let statuses = self
            .app_store
            .get_subscription_statuses(transaction_id)
            .await?;
        let transaction = statuses.find_transaction(transaction_id).ok_or_else(|| {
            ValidationError::invalid_format(
                "originalTransactionId",
                format!("no subscription found for transaction {}", transaction_id),
            )
        })?;

        let renewal: RenewalInfo = self
            .signed_payloads
            .verify(&transaction.signed_renewal_info)?;
        if !renewal.is_active() {
            tracing::info!(
                transaction_id,
                expiration_intent = ?renewal.expiration_intent,
                "App Store subscription is not active"
            );
            return Err(EntitlementError::InactiveSubscription);
        }

        Ok(ExternalId::new(renewal.original_transaction_id)?)
    }

    async fn verify_android(
        &self,
        receipt: &Map<String, Value>,
    ) -> Result<ExternalId, EntitlementError> {
        let purchase_token = string_field(receipt, "purchaseToken")
            .ok_or_else(|| ValidationError::empty_field("purchaseToken"))?;
        let purchase_token = store_identifier("purchaseToken", purchase_token)?;
        let receipt_product_id = string_field(receipt, "productId")
            .ok_or_else(|| ValidationError::empty_field("productId"))?;
        let product_id = match self.android_product_id.as_deref() {
            Some(configured) => configured,
            None => store_identifier("productId", receipt_product_id)?,
        };

        let purchase = self
            .play_store
            .get_subscription(product_id, purchase_token)
            .await?;
        if !purchase.is_entitlement_active(Timestamp::now()) {
            tracing::info!(product_id, "Play subscription is not active");
            return Err(EntitlementError::InactiveSubscription);
        }

        Ok(ExternalId::new(purchase_token)?)
    }
}

fn parse_receipt(receipt: &str) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_str(receipt) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::invalid_format(
            "transactionReceipt",
            "receipt must be a JSON object",
        )),
        Err(e) => Err(ValidationError::invalid_format("transactionReceipt", e.to_string())),
    }
}

fn string_field<'a>(receipt: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    receipt
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trust::test_chain::{ChainOptions, TestChain};
    use crate::ports::{
        LastTransaction, PaymentError, SubscriptionGroupStatus, SubscriptionPurchase,
        SubscriptionStatusResponse,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Doubles
    // ════════════════════════════════════════════════════════════════════════════

    struct StubAppStore {
        response: SubscriptionStatusResponse,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AppStoreClient for StubAppStore {
        async fn get_subscription_statuses(
            &self,
            transaction_id: &str,
        ) -> Result<SubscriptionStatusResponse, PaymentError> {
            self.requests.lock().unwrap().push(transaction_id.to_string());
            Ok(self.response.clone())
        }
    }

    struct StubPlayStore {
        result: Result<SubscriptionPurchase, PaymentError>,
        requests: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PlayStoreClient for StubPlayStore {
        async fn get_subscription(
            &self,
            product_id: &str,
            purchase_token: &str,
        ) -> Result<SubscriptionPurchase, PaymentError> {
            self.requests
                .lock()
                .unwrap()
                .push((product_id.to_string(), purchase_token.to_string()));
            self.result.clone()
        }
    }

    fn statuses(chain: &TestChain, original_transaction_id: &str, renewal: Value) -> SubscriptionStatusResponse {
        SubscriptionStatusResponse {
            data: vec![SubscriptionGroupStatus {
                subscription_group_identifier: Some("group".to_string()),
                last_transactions: vec![LastTransaction {
                    original_transaction_id: original_transaction_id.to_string(),
                    status: Some(1),
                    signed_transaction_info: None,
                    signed_renewal_info: chain.sign(&renewal),
                }],
            }],
        }
    }

    fn purchase_expiring_in(secs: i64) -> SubscriptionPurchase {
        SubscriptionPurchase {
            expiry_time_millis: Some(((Timestamp::now().as_unix_secs() + secs) * 1000).to_string()),
            ..Default::default()
        }
    }

    struct Fixture {
        app_store: Arc<StubAppStore>,
        play_store: Arc<StubPlayStore>,
        verifier: EntitlementVerifier,
    }

    fn fixture(
        chain: &TestChain,
        response: SubscriptionStatusResponse,
        play: Result<SubscriptionPurchase, PaymentError>,
    ) -> Fixture {
        let app_store = Arc::new(StubAppStore {
            response,
            requests: Mutex::new(Vec::new()),
        });
        let play_store = Arc::new(StubPlayStore {
            result: play,
            requests: Mutex::new(Vec::new()),
        });
        let verifier = EntitlementVerifier::new(
            app_store.clone(),
            play_store.clone(),
            Arc::new(SignedPayloadVerifier::new(Arc::new(chain.root_store()))),
        );
        Fixture {
            app_store,
            play_store,
            verifier,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // iOS
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_ios_receipt_yields_original_transaction_id() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&chain, "1000", json!({ "originalTransactionId": "1000", "autoRenewStatus": 1 })),
            Ok(purchase_expiring_in(3600)),
        );

        let ext = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"originalTransactionId":"1000","transactionId":"1001"}"#)
            .await
            .unwrap();

        assert_eq!(ext.as_str(), "1000");
        assert_eq!(f.app_store.requests.lock().unwrap().as_slice(), &["1000".to_string()]);
    }

    #[tokio::test]
    async fn ios_receipt_falls_back_to_transaction_id() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&chain, "1001", json!({ "originalTransactionId": "1001" })),
            Ok(purchase_expiring_in(3600)),
        );

        let ext = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"transactionId":"1001"}"#)
            .await
            .unwrap();

        assert_eq!(ext.as_str(), "1001");
    }

    #[tokio::test]
    async fn expired_ios_renewal_is_inactive() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&chain, "1000", json!({ "originalTransactionId": "1000", "expirationIntent": 1 })),
            Ok(purchase_expiring_in(3600)),
        );

        let err = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"originalTransactionId":"1000"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::InactiveSubscription));
    }

    #[tokio::test]
    async fn ios_transaction_missing_from_statuses_is_validation_error() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&chain, "other", json!({ "originalTransactionId": "other" })),
            Ok(purchase_expiring_in(3600)),
        );

        let err = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"originalTransactionId":"1000"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
    }

    #[tokio::test]
    async fn ios_transaction_id_with_path_characters_is_rejected_before_lookup() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&chain, "1000", json!({ "originalTransactionId": "1000" })),
            Ok(purchase_expiring_in(3600)),
        );

        let err = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"originalTransactionId":"9/../1000?x="}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
        assert!(f.app_store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ios_renewal_from_untrusted_chain_is_trust_error() {
        let chain = TestChain::generate(ChainOptions::default());
        let other = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            statuses(&other, "1000", json!({ "originalTransactionId": "1000" })),
            Ok(purchase_expiring_in(3600)),
        );

        let err = f
            .verifier
            .verify(PaymentSource::Ios, r#"{"originalTransactionId":"1000"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Trust(_)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Android
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_android_receipt_yields_purchase_token() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        let ext = f
            .verifier
            .verify(PaymentSource::Android, r#"{"purchaseToken":"tok-1","productId":"premium"}"#)
            .await
            .unwrap();

        assert_eq!(ext.as_str(), "tok-1");
        assert_eq!(
            f.play_store.requests.lock().unwrap().as_slice(),
            &[("premium".to_string(), "tok-1".to_string())]
        );
    }

    #[tokio::test]
    async fn configured_product_id_overrides_receipt() {
        let chain = TestChain::generate(ChainOptions::default());
        let mut f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));
        f.verifier = EntitlementVerifier::new(
            f.app_store.clone(),
            f.play_store.clone(),
            Arc::new(SignedPayloadVerifier::new(Arc::new(chain.root_store()))),
        )
        .with_android_product_id("premium_monthly");

        f.verifier
            .verify(PaymentSource::Android, r#"{"purchaseToken":"tok-1","productId":"x"}"#)
            .await
            .unwrap();

        assert_eq!(f.play_store.requests.lock().unwrap()[0].0, "premium_monthly");
    }

    #[tokio::test]
    async fn expired_android_purchase_is_inactive() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(-10)));

        let err = f
            .verifier
            .verify(PaymentSource::Android, r#"{"purchaseToken":"tok-1","productId":"p"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::InactiveSubscription));
    }

    #[tokio::test]
    async fn android_lookup_failure_is_upstream_error() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(
            &chain,
            SubscriptionStatusResponse::default(),
            Err(PaymentError::network(PaymentSource::Android, "connection reset")),
        );

        let err = f
            .verifier
            .verify(PaymentSource::Android, r#"{"purchaseToken":"tok-1","productId":"p"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Upstream { provider: "google_play", .. }));
    }

    #[tokio::test]
    async fn android_token_with_path_characters_is_rejected_before_lookup() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        for token in ["x/../tok-1", "tok-1?x=1", "tok-1#a", "..", "tok%2F1"] {
            let receipt = json!({ "purchaseToken": token, "productId": "premium" }).to_string();

            let err = f
                .verifier
                .verify(PaymentSource::Android, &receipt)
                .await
                .unwrap_err();

            assert!(matches!(err, EntitlementError::Validation(_)), "token {:?}", token);
        }
        assert!(f.play_store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn android_product_id_with_slash_is_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        let err = f
            .verifier
            .verify(PaymentSource::Android, r#"{"purchaseToken":"tok-1","productId":"../other"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
        assert!(f.play_store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn android_receipt_without_token_is_validation_error() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        let err = f
            .verifier
            .verify(PaymentSource::Android, r#"{"productId":"p"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
        assert!(f.play_store.requests.lock().unwrap().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Receipt shape
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn non_object_receipts_are_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        for receipt in ["not json", "[1,2]", "\"tok\""] {
            let err = f.verifier.verify(PaymentSource::Android, receipt).await.unwrap_err();
            assert!(matches!(err, EntitlementError::Validation(_)), "{}", receipt);
        }
    }

    #[tokio::test]
    async fn web_source_is_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let f = fixture(&chain, SubscriptionStatusResponse::default(), Ok(purchase_expiring_in(3600)));

        let err = f.verifier.verify(PaymentSource::Web, "{}").await.unwrap_err();

        assert!(matches!(err, EntitlementError::Validation(_)));
    }
}

//! Production-then-sandbox App Store client.
//!
//! Receipts from TestFlight and review builds belong to the sandbox
//! environment, so any production failure is retried against sandbox.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{AppStoreClient, PaymentError, SubscriptionStatusResponse};

pub struct FallbackAppStoreClient {
    production: Arc<dyn AppStoreClient>,
    sandbox: Arc<dyn AppStoreClient>,
}

impl FallbackAppStoreClient {
    pub fn new(production: Arc<dyn AppStoreClient>, sandbox: Arc<dyn AppStoreClient>) -> Self {
        Self {
            production,
            sandbox,
        }
    }
}

#[async_trait]
impl AppStoreClient for FallbackAppStoreClient {
    async fn get_subscription_statuses(
        &self,
        transaction_id: &str,
    ) -> Result<SubscriptionStatusResponse, PaymentError> {
        match self.production.get_subscription_statuses(transaction_id).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::warn!(
                    transaction_id,
                    error = %err,
                    "Production App Store lookup failed, retrying against sandbox"
                );
                self.sandbox.get_subscription_statuses(transaction_id).await
            }
        }
    }
}

//! VerifyPurchaseHandler - Command handler for client-submitted store receipts.

use std::sync::Arc;

use crate::domain::entitlement::{EntitlementError, EntitlementRecord, PaymentSource};
use crate::domain::foundation::{UserId, ValidationError};

use super::{EntitlementVerifier, ReconciliationEngine};

pub const MAX_RECEIPT_BYTES: usize = 1024;

/// Command to verify a receipt and grant premium to the submitting user.
#[derive(Debug, Clone)]
pub struct VerifyPurchaseCommand {
    pub user_id: UserId,
    pub source: PaymentSource,
    pub transaction_receipt: String,
}

#[derive(Debug, Clone)]
pub struct VerifyPurchaseResult {
    pub record: EntitlementRecord,
}

pub struct VerifyPurchaseHandler {
    verifier: Arc<EntitlementVerifier>,
    engine: Arc<ReconciliationEngine>,
}

impl VerifyPurchaseHandler {
    pub fn new(verifier: Arc<EntitlementVerifier>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { verifier, engine }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPurchaseCommand,
    ) -> Result<VerifyPurchaseResult, EntitlementError> {
        let len = cmd.transaction_receipt.len();
        if len == 0 || len > MAX_RECEIPT_BYTES {
            return Err(
                ValidationError::out_of_range("transactionReceipt", 1, MAX_RECEIPT_BYTES, len)
                    .into(),
            );
        }

        let external_id = self
            .verifier
            .verify(cmd.source, &cmd.transaction_receipt)
            .await?;

        let fulfillment = self
            .engine
            .fulfill_for(&cmd.user_id, external_id, cmd.source)
            .await?;

        Ok(VerifyPurchaseResult {
            record: fulfillment.record,
        })
    }
}

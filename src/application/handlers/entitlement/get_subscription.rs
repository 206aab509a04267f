//! GetSubscriptionHandler - Query handler for the user's plan, syncing a
//! just-completed web checkout first when its session id is supplied.

use std::sync::Arc;

use crate::domain::entitlement::{
    EntitlementError, EntitlementRecord, PaymentSource, PlanInterval, PlanKeyname,
};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::UserRepository;

use super::{CheckoutFulfillmentLookup, ReconciliationEngine};

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
    /// Session id from the checkout success redirect.
    pub checkout_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSubscriptionResult {
    pub source: Option<PaymentSource>,
    pub plan_keyname: PlanKeyname,
    pub plan_interval: PlanInterval,
}

impl From<EntitlementRecord> for GetSubscriptionResult {
    fn from(record: EntitlementRecord) -> Self {
        Self {
            source: record.source,
            plan_keyname: record.plan_keyname,
            plan_interval: record.plan_interval,
        }
    }
}

pub struct GetSubscriptionHandler {
    users: Arc<dyn UserRepository>,
    checkout: Arc<CheckoutFulfillmentLookup>,
    engine: Arc<ReconciliationEngine>,
}

impl GetSubscriptionHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        checkout: Arc<CheckoutFulfillmentLookup>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            users,
            checkout,
            engine,
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<GetSubscriptionResult, EntitlementError> {
        if let Some(session_id) = query.checkout_session_id.as_deref() {
            if let Some(fulfillment) = self.checkout.lookup(session_id).await? {
                if fulfillment.user_id != query.user_id {
                    tracing::warn!(
                        session_id,
                        user_id = %query.user_id,
                        "Checkout session belongs to another user"
                    );
                    return Err(EntitlementError::Conflict(
                        "checkout session belongs to a different user".to_string(),
                    ));
                }

                let fulfillment = self
                    .engine
                    .fulfill_for(&query.user_id, fulfillment.customer_id, PaymentSource::Web)
                    .await?;
                return Ok(fulfillment.record.into());
            }
        }

        let account = self.users.find_by_id(&query.user_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", query.user_id.as_str())
        })?;

        Ok(account.entitlement.into())
    }
}

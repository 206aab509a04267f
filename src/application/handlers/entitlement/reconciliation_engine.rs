//! ReconciliationEngine - Applies fulfill/cancel decisions to user plan state.
//!
//! One external id backs at most one premium user. Fulfilling an id that a
//! different user holds demotes that user first (ownership transfer). Every
//! write is skipped when the record already holds the target state, so
//! repeated notifications are idempotent.

use std::sync::Arc;

use crate::domain::entitlement::{
    CanonicalNotification, EntitlementError, EntitlementRecord, NotificationAction, PaymentSource,
    PlanUpdate,
};
use crate::domain::foundation::{DomainError, ErrorCode, ExternalId, UserId};
use crate::ports::UserRepository;

/// Result of a fulfill against a known owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    /// The owner's record after the fulfill.
    pub record: EntitlementRecord,
    /// Previous holder demoted to free, if the id changed hands.
    pub displaced: Option<UserId>,
    /// False when the record already held the premium state.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Fulfilled(Fulfillment),
    Demoted { user_id: UserId },
    /// No user holds or claims the external id.
    NoOwner { external_id: ExternalId },
}

pub struct ReconciliationEngine {
    users: Arc<dyn UserRepository>,
}

impl ReconciliationEngine {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn apply(
        &self,
        notification: &CanonicalNotification,
    ) -> Result<ReconciliationOutcome, EntitlementError> {
        match notification.action {
            NotificationAction::Fulfill => {
                let owner = match &notification.user_id {
                    Some(user_id) => Some(user_id.clone()),
                    None => {
                        self.users
                            .find_user_id_by_external_id(&notification.external_id)
                            .await?
                    }
                };

                let Some(owner) = owner else {
                    tracing::info!(
                        external_id = %notification.external_id,
                        source = %notification.source,
                        "Fulfill for external id with no owner"
                    );
                    return Ok(ReconciliationOutcome::NoOwner {
                        external_id: notification.external_id.clone(),
                    });
                };

                let fulfillment = self
                    .fulfill_for(
                        &owner,
                        notification.external_id.clone(),
                        notification.source,
                    )
                    .await?;
                Ok(ReconciliationOutcome::Fulfilled(fulfillment))
            }
            NotificationAction::Cancel => self.cancel(&notification.external_id).await,
        }
    }

    /// Promotes `owner` to premium backed by `external_id`, demoting any
    /// other current holder of the id first.
    ///
    /// The owner account is loaded before anything is written, so an unknown
    /// owner leaves the current holder untouched.
    pub async fn fulfill_for(
        &self,
        owner: &UserId,
        external_id: ExternalId,
        source: PaymentSource,
    ) -> Result<Fulfillment, EntitlementError> {
        let account = self.users.find_by_id(owner).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", owner.as_str())
        })?;

        let displaced = match self.users.find_user_id_by_external_id(&external_id).await? {
            Some(holder) if &holder != owner => {
                self.users
                    .update_user_plan(&holder, &PlanUpdate::free())
                    .await?;
                tracing::info!(
                    from = %holder,
                    to = %owner,
                    external_id = %external_id,
                    "Transferred subscription between users"
                );
                Some(holder)
            }
            _ => None,
        };

        let update = PlanUpdate::premium(external_id, source);
        if account.entitlement.matches(&update) {
            tracing::debug!(user_id = %owner, "Entitlement already premium");
            return Ok(Fulfillment {
                record: account.entitlement,
                displaced,
                changed: false,
            });
        }

        self.users.update_user_plan(owner, &update).await?;
        tracing::info!(user_id = %owner, source = %source, "User promoted to premium");

        Ok(Fulfillment {
            record: account.entitlement.with_update(&update),
            displaced,
            changed: true,
        })
    }

    async fn cancel(
        &self,
        external_id: &ExternalId,
    ) -> Result<ReconciliationOutcome, EntitlementError> {
        let Some(holder) = self.users.find_user_id_by_external_id(external_id).await? else {
            tracing::warn!(external_id = %external_id, "No user found for cancelled external id");
            return Ok(ReconciliationOutcome::NoOwner {
                external_id: external_id.clone(),
            });
        };

        self.users
            .update_user_plan(&holder, &PlanUpdate::free())
            .await?;
        tracing::info!(user_id = %holder, "User demoted to free");

        Ok(ReconciliationOutcome::Demoted { user_id: holder })
    }
}

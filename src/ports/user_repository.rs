//! User store port.
//!
//! The core reads ownership and current plan state here and asks for plan
//! writes; it never owns user records itself.

use async_trait::async_trait;

use crate::domain::entitlement::{PlanUpdate, UserAccount};
use crate::domain::foundation::{DomainError, ExternalId, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Reverse lookup: the user whose record holds `external_id`.
    async fn find_user_id_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<UserId>, DomainError>;

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError>;

    /// Overwrites the user's plan fields with `update`.
    async fn update_user_plan(&self, user_id: &UserId, update: &PlanUpdate)
        -> Result<(), DomainError>;
}

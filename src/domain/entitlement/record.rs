//! Entitlement record and the plan updates the core requests.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ExternalId, UserId};

use super::{PaymentSource, PlanInterval, PlanKeyname};

/// Per-user plan state, owned by the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub user_id: UserId,
    pub plan_keyname: PlanKeyname,
    pub plan_interval: PlanInterval,
    pub external_id: Option<ExternalId>,
    pub source: Option<PaymentSource>,
}

impl EntitlementRecord {
    /// A free record with no external identity.
    pub fn free(user_id: UserId) -> Self {
        Self {
            user_id,
            plan_keyname: PlanKeyname::Free,
            plan_interval: PlanInterval::Monthly,
            external_id: None,
            source: None,
        }
    }

    /// True when the record already holds every field of `update`.
    pub fn matches(&self, update: &PlanUpdate) -> bool {
        self.plan_keyname == update.plan_keyname
            && self.plan_interval == update.plan_interval
            && self.external_id == update.external_id
            && self.source == update.source
    }

    /// Returns the record as it looks after `update` is written.
    pub fn with_update(&self, update: &PlanUpdate) -> Self {
        Self {
            user_id: self.user_id.clone(),
            plan_keyname: update.plan_keyname,
            plan_interval: update.plan_interval,
            external_id: update.external_id.clone(),
            source: update.source,
        }
    }
}

/// The write the core asks the user store to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub plan_keyname: PlanKeyname,
    pub plan_interval: PlanInterval,
    pub external_id: Option<ExternalId>,
    pub source: Option<PaymentSource>,
}

impl PlanUpdate {
    /// Monthly premium backed by `external_id`.
    pub fn premium(external_id: ExternalId, source: PaymentSource) -> Self {
        Self {
            plan_keyname: PlanKeyname::Premium,
            plan_interval: PlanInterval::Monthly,
            external_id: Some(external_id),
            source: Some(source),
        }
    }

    /// Free with the external identity cleared.
    pub fn free() -> Self {
        Self {
            plan_keyname: PlanKeyname::Free,
            plan_interval: PlanInterval::Monthly,
            external_id: None,
            source: None,
        }
    }
}

/// A user as seen by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub email: String,
    pub entitlement: EntitlementRecord,
}

impl UserAccount {
    pub fn id(&self) -> &UserId {
        &self.entitlement.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn free_record_matches_free_update() {
        let record = EntitlementRecord::free(user());
        assert!(record.matches(&PlanUpdate::free()));
    }

    #[test]
    fn premium_update_changes_record() {
        let record = EntitlementRecord::free(user());
        let update = PlanUpdate::premium(ExternalId::new("cus_1").unwrap(), PaymentSource::Web);

        assert!(!record.matches(&update));

        let next = record.with_update(&update);
        assert_eq!(next.plan_keyname, PlanKeyname::Premium);
        assert_eq!(next.source, Some(PaymentSource::Web));
        assert!(next.matches(&update));
        assert_eq!(next.user_id, user());
    }

    #[test]
    fn premium_with_other_external_id_does_not_match() {
        let record = EntitlementRecord::free(user()).with_update(&PlanUpdate::premium(
            ExternalId::new("a").unwrap(),
            PaymentSource::Ios,
        ));
        let update = PlanUpdate::premium(ExternalId::new("b").unwrap(), PaymentSource::Ios);

        assert!(!record.matches(&update));
    }
}

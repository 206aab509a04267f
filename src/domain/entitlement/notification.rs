//! Canonical notification: the normalized output of every provider decoder.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ExternalId, UserId};

use super::PaymentSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Fulfill,
    Cancel,
}

/// `{action, source, external_id, user_id}` decided from one provider message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalNotification {
    pub action: NotificationAction,
    pub source: PaymentSource,
    pub external_id: ExternalId,
    /// Set only when the provider names the user directly (web checkout).
    pub user_id: Option<UserId>,
}

impl CanonicalNotification {
    pub fn fulfill(source: PaymentSource, external_id: ExternalId) -> Self {
        Self {
            action: NotificationAction::Fulfill,
            source,
            external_id,
            user_id: None,
        }
    }

    pub fn cancel(source: PaymentSource, external_id: ExternalId) -> Self {
        Self {
            action: NotificationAction::Cancel,
            source,
            external_id,
            user_id: None,
        }
    }

    /// Fulfill when `active`, cancel otherwise.
    pub fn from_activity(active: bool, source: PaymentSource, external_id: ExternalId) -> Self {
        if active {
            Self::fulfill(source, external_id)
        } else {
            Self::cancel(source, external_id)
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

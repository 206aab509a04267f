//! Entitlement module - Canonical plan state across payment providers.
//!
//! - `CanonicalNotification`: normalized `{action, source, external_id}` decision
//! - `EntitlementRecord`: per-user plan state and the `PlanUpdate` written to it
//! - `InboundNotification`: the three provider wire shapes as a closed union
//! - `EntitlementError`: validation, trust, inactive, upstream, conflict, repository

mod errors;
mod inbound;
mod notification;
mod plan;
mod record;

pub use errors::EntitlementError;
pub use inbound::{decode_android_envelope, InboundNotification, SubscriptionNotice};
pub use notification::{CanonicalNotification, NotificationAction};
pub use plan::{PaymentSource, PlanInterval, PlanKeyname};
pub use record::{EntitlementRecord, PlanUpdate, UserAccount};

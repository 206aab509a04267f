//! Plan and payment source definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Plan a user is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKeyname {
    Free,
    Premium,
}

impl PlanKeyname {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKeyname::Free => "free",
            PlanKeyname::Premium => "premium",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PlanKeyname::Premium)
    }
}

impl FromStr for PlanKeyname {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanKeyname::Free),
            "premium" => Ok(PlanKeyname::Premium),
            other => Err(ValidationError::invalid_format(
                "plan_keyname",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}

/// Billing interval of a plan.
///
/// Only monthly is sold today; yearly is carried so stored records round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    #[default]
    Monthly,
    Yearly,
}

impl PlanInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanInterval::Monthly => "monthly",
            PlanInterval::Yearly => "yearly",
        }
    }
}

impl FromStr for PlanInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PlanInterval::Monthly),
            "yearly" => Ok(PlanInterval::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan_interval",
                format!("unknown interval '{}'", other),
            )),
        }
    }
}

/// Payment ecosystem an entitlement came from.
///
/// The web provider is stored and reported as `stripe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentSource {
    #[serde(rename = "stripe")]
    Web,
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "android")]
    Android,
}

impl PaymentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSource::Web => "stripe",
            PaymentSource::Ios => "ios",
            PaymentSource::Android => "android",
        }
    }

    /// Store name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentSource::Web => "Stripe",
            PaymentSource::Ios => "the App Store",
            PaymentSource::Android => "Google Play",
        }
    }

    /// True for the two in-app stores.
    pub fn is_app_store(&self) -> bool {
        matches!(self, PaymentSource::Ios | PaymentSource::Android)
    }
}

impl FromStr for PaymentSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentSource::Web),
            "ios" => Ok(PaymentSource::Ios),
            "android" => Ok(PaymentSource::Android),
            other => Err(ValidationError::invalid_format(
                "iap_source",
                format!("unknown payment source '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

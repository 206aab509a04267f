//! Entitlement error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | Trust | 401 |
//! | Conflict | 409 |
//! | InactiveSubscription | 410 |
//! | Repository | 500 |
//! | Upstream | 502 |

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};
use crate::domain::trust::{SignedPayloadError, TrustError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// Malformed or unparseable input.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Signature or certificate chain verification failed.
    #[error("Trust verification failed: {0}")]
    Trust(#[from] TrustError),

    /// The receipt is genuine but the subscription is not active.
    #[error("Subscription is not active")]
    InactiveSubscription,

    /// A payment provider call failed.
    #[error("{provider} request failed: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },

    /// Ownership did not match what the caller presented.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The user store failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl EntitlementError {
    pub fn upstream(provider: &'static str, message: impl Into<String>) -> Self {
        EntitlementError::Upstream {
            provider,
            message: message.into(),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EntitlementError::Upstream { .. } | EntitlementError::Repository(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntitlementError::Validation(_) => StatusCode::BAD_REQUEST,
            EntitlementError::Trust(_) => StatusCode::UNAUTHORIZED,
            EntitlementError::InactiveSubscription => StatusCode::GONE,
            EntitlementError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            EntitlementError::Conflict(_) => StatusCode::CONFLICT,
            EntitlementError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SignedPayloadError> for EntitlementError {
    fn from(err: SignedPayloadError) -> Self {
        match err {
            SignedPayloadError::Invalid(e) => EntitlementError::Validation(e),
            SignedPayloadError::Trust(e) => EntitlementError::Trust(e),
        }
    }
}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        EntitlementError::Repository(err.to_string())
    }
}

//! Error type shared by every payment provider port.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::{EntitlementError, PaymentSource};
use crate::domain::foundation::ValidationError;

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Provider the call was made to.
    pub source: PaymentSource,

    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(source: PaymentSource, code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            source,
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(source: PaymentSource, message: impl Into<String>) -> Self {
        Self::new(source, PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(source: PaymentSource, message: impl Into<String>) -> Self {
        Self::new(source, PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(source: PaymentSource, resource: &str) -> Self {
        Self::new(
            source,
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create an invalid webhook error.
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentSource::Web, PaymentErrorCode::InvalidWebhook, message)
    }

    /// Create an error for an unexpected provider response.
    pub fn provider(source: PaymentSource, message: impl Into<String>) -> Self {
        Self::new(source, PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for EntitlementError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::InvalidWebhook => EntitlementError::Validation(
                ValidationError::invalid_format("stripe-signature", err.message),
            ),
            _ => EntitlementError::upstream(provider_name(err.source), err.to_string()),
        }
    }
}

fn provider_name(source: PaymentSource) -> &'static str {
    match source {
        PaymentSource::Web => "stripe",
        PaymentSource::Ios => "app_store",
        PaymentSource::Android => "google_play",
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Invalid webhook signature.
    InvalidWebhook,

    /// Provider API error or unexpected response.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidWebhook => "invalid_webhook",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

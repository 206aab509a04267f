//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Internal identifier of a user account.
///
/// Opaque to this crate: whatever the user store hands out is accepted as
/// long as it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-side identifier anchoring an entitlement to a purchase.
///
/// A web customer id (`cus_...`), an App Store original transaction id, or a
/// Play Store purchase token, depending on the payment source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates a new ExternalId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("external_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Checks an App Store or Play Store identifier taken from client input.
///
/// Store transaction ids, product ids and purchase tokens are limited to
/// `[A-Za-z0-9._-]`, so one purchase has exactly one spelling and the value
/// is safe as a single provider URL path segment.
pub fn store_identifier<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');

    match () {
        _ if value.is_empty() => Err(ValidationError::empty_field(field)),
        _ if !value.chars().all(allowed) => Err(ValidationError::invalid_format(
            field,
            "only ASCII letters, digits, '.', '-' and '_' are allowed",
        )),
        _ if !value.chars().any(|c| c.is_ascii_alphanumeric()) => Err(
            ValidationError::invalid_format(field, "must contain a letter or digit"),
        ),
        _ => Ok(value),
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

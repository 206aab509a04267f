//! Google Play configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::google_play::{ServiceAccountSigner, DEFAULT_TOKEN_URI};
use crate::ports::PaymentError;

use super::error::ValidationError;

/// Service account and app identity for the Android Publisher API
#[derive(Debug, Clone, Deserialize)]
pub struct GooglePlaySettings {
    /// Application package name
    pub package_name: String,

    /// Subscription product looked up for receipt verification
    pub product_id: String,

    /// Service account email
    pub client_email: String,

    /// Service account RSA private key (PEM)
    pub private_key: SecretString,

    /// OAuth token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl GooglePlaySettings {
    pub fn signer(&self) -> Result<ServiceAccountSigner, PaymentError> {
        ServiceAccountSigner::from_pem(
            self.client_email.clone(),
            self.private_key.expose_secret(),
            self.token_uri.clone(),
        )
    }

    /// Validate Google Play configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.package_name.is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE_PLAY__PACKAGE_NAME"));
        }
        if self.product_id.is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE_PLAY__PRODUCT_ID"));
        }
        if self.client_email.is_empty() {
            return Err(ValidationError::MissingRequired("GOOGLE_PLAY__CLIENT_EMAIL"));
        }
        if !self.private_key.expose_secret().contains("PRIVATE KEY-----") {
            return Err(ValidationError::InvalidPrivateKey("GOOGLE_PLAY__PRIVATE_KEY"));
        }
        Ok(())
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GooglePlaySettings {
        GooglePlaySettings {
            package_name: "com.example.app".to_string(),
            product_id: "premium_monthly".to_string(),
            client_email: "sync@example.iam.gserviceaccount.com".to_string(),
            private_key: SecretString::new(include_str!("../../tests/fixtures/service_account_key.pem").to_string()),
            token_uri: default_token_uri(),
        }
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_signer_builds_from_fixture_key() {
        assert!(settings().signer().is_ok());
    }

    #[test]
    fn test_validation_missing_product() {
        let config = GooglePlaySettings {
            product_id: String::new(),
            ..settings()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("GOOGLE_PLAY__PRODUCT_ID"))
        ));
    }
}

//! Web payment configuration (Stripe)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::stripe::StripeConfig;
use crate::application::handlers::entitlement::{PortalReturnUrls, DEFAULT_CHECKOUT_REDIRECT_URL};

use super::error::ValidationError;

/// Web payment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    /// Stripe API key
    pub api_key: SecretString,

    /// Stripe webhook signing secret
    pub webhook_secret: SecretString,

    /// Price sold by checkout sessions
    pub price_id: String,

    /// Success and cancel URL for checkout
    #[serde(default = "default_checkout_redirect_url")]
    pub checkout_redirect_url: String,

    /// Portal return URL for the mobile app
    pub portal_return_url_app: Option<String>,

    /// Portal return URL for the web app
    pub portal_return_url_web: Option<String>,

    /// Override for the API base URL
    pub api_base_url: Option<String>,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl StripeSettings {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn adapter_config(&self) -> StripeConfig {
        let config = StripeConfig::new(
            self.api_key.expose_secret().clone(),
            self.webhook_secret.expose_secret().clone(),
            self.price_id.clone(),
        )
        .with_require_livemode(self.require_livemode);

        match &self.api_base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    pub fn portal_return_urls(&self) -> PortalReturnUrls {
        PortalReturnUrls {
            app: self.portal_return_url_app.clone(),
            web: self.portal_return_url_web.clone(),
        }
    }

    /// Validate web payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.api_key.expose_secret();
        let webhook_secret = self.webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE__API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE__WEBHOOK_SECRET"));
        }
        if self.price_id.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE__PRICE_ID"));
        }

        // Verify key prefixes for safety
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !self.checkout_redirect_url.contains("{CHECKOUT_SESSION_ID}") {
            return Err(ValidationError::MissingSessionPlaceholder);
        }

        Ok(())
    }
}

fn default_checkout_redirect_url() -> String {
    DEFAULT_CHECKOUT_REDIRECT_URL.to_string()
}

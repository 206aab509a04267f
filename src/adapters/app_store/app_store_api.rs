//! App Store Server API client.
//!
//! Every request carries a short-lived ES256 bearer token signed with the
//! In-App Purchase key downloaded from App Store Connect.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AppStoreApiConfig::new(issuer_id, key_id, bundle_id, private_key_pem)
//!     .with_environment(AppStoreEnvironment::Sandbox);
//!
//! let client = AppStoreServerApi::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::entitlement::PaymentSource;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    AppStoreClient, AppStoreEnvironment, PaymentError, PaymentErrorCode,
    SubscriptionStatusResponse,
};

const PRODUCTION_BASE_URL: &str = "https://api.storekit.itunes.apple.com";
const SANDBOX_BASE_URL: &str = "https://api.storekit-sandbox.itunes.apple.com";

/// Audience the App Store Server API expects in request tokens.
const TOKEN_AUDIENCE: &str = "appstoreconnect-v1";

/// Request token lifetime. The API rejects anything over one hour.
const TOKEN_LIFETIME_SECS: i64 = 20 * 60;

/// Configuration for the App Store Server API client.
#[derive(Clone)]
pub struct AppStoreApiConfig {
    pub issuer_id: String,
    pub key_id: String,
    pub bundle_id: String,
    private_key_pem: SecretString,
    pub environment: AppStoreEnvironment,
    pub base_url: String,
    pub timeout: Duration,
}

impl AppStoreApiConfig {
    pub fn new(
        issuer_id: impl Into<String>,
        key_id: impl Into<String>,
        bundle_id: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            key_id: key_id.into(),
            bundle_id: bundle_id.into(),
            private_key_pem: SecretString::new(private_key_pem.into()),
            environment: AppStoreEnvironment::Production,
            base_url: PRODUCTION_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Selects the environment and its default base URL.
    pub fn with_environment(mut self, environment: AppStoreEnvironment) -> Self {
        self.environment = environment;
        self.base_url = match environment {
            AppStoreEnvironment::Production => PRODUCTION_BASE_URL,
            AppStoreEnvironment::Sandbox => SANDBOX_BASE_URL,
        }
        .to_string();
        self
    }

    /// Sets the base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiTokenClaims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
    bid: String,
}

/// Environment-scoped App Store Server API client.
pub struct AppStoreServerApi {
    config: AppStoreApiConfig,
    signing_key: EncodingKey,
    client: Client,
}

impl AppStoreServerApi {
    pub fn new(config: AppStoreApiConfig) -> Result<Self, PaymentError> {
        let signing_key = EncodingKey::from_ec_pem(config.private_key_pem.expose_secret().as_bytes())
            .map_err(|e| {
                PaymentError::authentication(
                    PaymentSource::Ios,
                    format!("Invalid App Store private key: {}", e),
                )
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(PaymentSource::Ios, e.to_string()))?;

        Ok(Self {
            config,
            signing_key,
            client,
        })
    }

    pub fn environment(&self) -> AppStoreEnvironment {
        self.config.environment
    }

    /// Signs a request token valid from `now`.
    fn api_token(&self, now: Timestamp) -> Result<String, PaymentError> {
        let issued_at = now.as_unix_secs();
        let claims = ApiTokenClaims {
            iss: self.config.issuer_id.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
            aud: TOKEN_AUDIENCE.to_string(),
            bid: self.config.bundle_id.clone(),
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.config.key_id.clone());
        header.typ = Some("JWT".to_string());

        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|e| {
            PaymentError::authentication(
                PaymentSource::Ios,
                format!("Failed to sign App Store API token: {}", e),
            )
        })
    }

    fn statuses_url(&self, transaction_id: &str) -> Result<Url, PaymentError> {
        let invalid = || {
            PaymentError::provider(
                PaymentSource::Ios,
                format!("Invalid App Store base URL: {}", self.config.base_url),
            )
        };

        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["inApps", "v1", "subscriptions"])
            .push(transaction_id);
        Ok(url)
    }
}

#[async_trait]
impl AppStoreClient for AppStoreServerApi {
    async fn get_subscription_statuses(
        &self,
        transaction_id: &str,
    ) -> Result<SubscriptionStatusResponse, PaymentError> {
        let url = self.statuses_url(transaction_id)?;
        let token = self.api_token(Timestamp::now())?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PaymentError::network(PaymentSource::Ios, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                environment = ?self.config.environment,
                %status,
                error = %body,
                "App Store subscription status request failed"
            );
            let err = match status {
                StatusCode::NOT_FOUND => PaymentError::not_found(PaymentSource::Ios, "Transaction"),
                StatusCode::UNAUTHORIZED => {
                    PaymentError::authentication(PaymentSource::Ios, body)
                }
                StatusCode::TOO_MANY_REQUESTS => PaymentError::new(
                    PaymentSource::Ios,
                    PaymentErrorCode::RateLimitExceeded,
                    body,
                ),
                s if s.is_server_error() => PaymentError::network(PaymentSource::Ios, body),
                _ => PaymentError::provider(PaymentSource::Ios, body),
            };
            return Err(err.with_provider_code(status.as_str()));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(
                PaymentSource::Ios,
                format!("Failed to parse subscription statuses: {}", e),
            )
        })
    }
}

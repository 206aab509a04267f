//! OAuth token endpoint client for the JWT-bearer grant.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::domain::entitlement::PaymentSource;
use crate::ports::{PaymentError, TokenExchanger, TokenGrant};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub struct HttpTokenExchanger {
    token_uri: String,
    client: Client,
}

impl HttpTokenExchanger {
    pub fn new(token_uri: impl Into<String>) -> Self {
        Self {
            token_uri: token_uri.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, assertion: &str) -> Result<TokenGrant, PaymentError> {
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| PaymentError::network(PaymentSource::Android, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, error = %body, "Token exchange failed");
            let err = match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    PaymentError::authentication(PaymentSource::Android, body)
                }
                s if s.is_server_error() => PaymentError::network(PaymentSource::Android, body),
                _ => PaymentError::provider(PaymentSource::Android, body),
            };
            return Err(err.with_provider_code(status.as_str()));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(
                PaymentSource::Android,
                format!("Failed to parse token response: {}", e),
            )
        })
    }
}

//! Android Publisher REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::domain::entitlement::PaymentSource;
use crate::ports::{PaymentError, PaymentErrorCode, PlayStoreClient, SubscriptionPurchase};

use super::BearerTokenCache;

const DEFAULT_BASE_URL: &str = "https://androidpublisher.googleapis.com";

/// `purchases.subscriptions.get` for one application package.
pub struct GooglePlayDeveloperApi {
    package_name: String,
    base_url: String,
    tokens: Arc<BearerTokenCache>,
    client: Client,
}

impl GooglePlayDeveloperApi {
    pub fn new(package_name: impl Into<String>, tokens: Arc<BearerTokenCache>) -> Self {
        Self {
            package_name: package_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
            client: Client::new(),
        }
    }

    /// Sets the base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Each id is pushed as a single percent-encoded path segment.
    fn subscription_url(&self, product_id: &str, purchase_token: &str) -> Result<Url, PaymentError> {
        let invalid = || {
            PaymentError::provider(
                PaymentSource::Android,
                format!("Invalid Android Publisher base URL: {}", self.base_url),
            )
        };

        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["androidpublisher", "v3", "applications"])
            .push(&self.package_name)
            .extend(["purchases", "subscriptions"])
            .push(product_id)
            .push("tokens")
            .push(purchase_token);
        Ok(url)
    }
}

#[async_trait]
impl PlayStoreClient for GooglePlayDeveloperApi {
    async fn get_subscription(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionPurchase, PaymentError> {
        let url = self.subscription_url(product_id, purchase_token)?;
        let token = self.tokens.get_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PaymentError::network(PaymentSource::Android, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(product_id, %status, error = %body, "Subscription lookup failed");
            let err = match status {
                StatusCode::NOT_FOUND | StatusCode::GONE => {
                    PaymentError::not_found(PaymentSource::Android, "Subscription purchase")
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PaymentError::authentication(PaymentSource::Android, body)
                }
                StatusCode::TOO_MANY_REQUESTS => PaymentError::new(
                    PaymentSource::Android,
                    PaymentErrorCode::RateLimitExceeded,
                    body,
                ),
                s if s.is_server_error() => PaymentError::network(PaymentSource::Android, body),
                _ => PaymentError::provider(PaymentSource::Android, body),
            };
            return Err(err.with_provider_code(status.as_str()));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(
                PaymentSource::Android,
                format!("Failed to parse subscription purchase: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::adapters::google_play::{ServiceAccountSigner, DEFAULT_TOKEN_URI};
    use crate::ports::{TokenExchanger, TokenGrant};

    const PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pem");

    struct StaticExchanger;

    #[async_trait]
    impl TokenExchanger for StaticExchanger {
        async fn exchange(&self, _assertion: &str) -> Result<TokenGrant, PaymentError> {
            Ok(TokenGrant {
                access_token: "ya29.test".to_string(),
                expires_in: 3600,
            })
        }
    }

    fn api(base_url: &str) -> GooglePlayDeveloperApi {
        let signer = ServiceAccountSigner::from_pem("svc@x", PRIVATE_KEY, DEFAULT_TOKEN_URI).unwrap();
        let tokens = Arc::new(BearerTokenCache::new(signer, Arc::new(StaticExchanger)));
        GooglePlayDeveloperApi::new("com.example.app", tokens).with_base_url(base_url)
    }

    /// Accepts one connection, answers 404 and returns the request line.
    async fn capture_request_line(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&buf).to_string();
        text.lines().next().unwrap_or_default().to_string()
    }

    // ═══════════════════════════════════════════════════════════════
    // URL building
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_url_follows_publisher_layout() {
        assert_eq!(
            api("https://play.test")
                .subscription_url("premium_monthly", "tok")
                .unwrap()
                .as_str(),
            "https://play.test/androidpublisher/v3/applications/com.example.app/purchases/subscriptions/premium_monthly/tokens/tok"
        );
    }

    #[test]
    fn trailing_slash_on_base_url_is_tolerated() {
        let url = api("https://play.test/")
            .subscription_url("premium_monthly", "tok")
            .unwrap();

        assert!(url.path().starts_with("/androidpublisher/v3/"));
    }

    #[test]
    fn token_with_path_characters_stays_in_one_segment() {
        let url = api("https://play.test")
            .subscription_url("premium_monthly", "x/../../v1/other?ignored=#frag")
            .unwrap();

        assert_eq!(
            url.path(),
            "/androidpublisher/v3/applications/com.example.app/purchases/subscriptions/premium_monthly/tokens/x%2F..%2F..%2Fv1%2Fother%3Fignored=%23frag"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn product_id_with_slash_is_encoded() {
        let url = api("https://play.test")
            .subscription_url("premium/../other", "tok")
            .unwrap();

        assert!(url.path().contains("/subscriptions/premium%2F..%2Fother/tokens/tok"));
    }

    #[test]
    fn malformed_base_url_is_provider_error() {
        let err = api("not a url").subscription_url("p", "t").unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
    }

    // ═══════════════════════════════════════════════════════════════
    // Requests
    // ═══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn traversal_token_reaches_the_tokens_segment_on_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(capture_request_line(listener));

        let err = api(&base)
            .get_subscription("premium_monthly", "x/../../../../../../../v1/other?ignored=")
            .await
            .unwrap_err();
        let request_line = server.await.unwrap();

        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert!(
            request_line.starts_with(
                "GET /androidpublisher/v3/applications/com.example.app/purchases/subscriptions/premium_monthly/tokens/x%2F..%2F"
            ),
            "unexpected request line: {}",
            request_line
        );
        assert!(!request_line.contains("/v1/other"));
        assert!(!request_line.contains('?'));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let err = api("http://127.0.0.1:1")
            .get_subscription("premium_monthly", "tok")
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::NetworkError);
        assert_eq!(err.source, PaymentSource::Android);
    }
}

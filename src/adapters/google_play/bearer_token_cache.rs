//! Cached OAuth bearer token for the Android Publisher API.
//!
//! Tokens are obtained with the service-account JWT-bearer grant and reused
//! until five minutes before they expire. Concurrent callers that race a
//! miss may each exchange; the last successful exchange wins the slot.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::entitlement::PaymentSource;
use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentError, TokenExchanger};

/// Scope required for `purchases.subscriptions.get`.
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A cached token is refreshed once it is this close to expiry.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

const ASSERTION_LIFETIME_SECS: i64 = 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs JWT-bearer assertions as a service account.
pub struct ServiceAccountSigner {
    client_email: String,
    key: EncodingKey,
    scope: String,
    token_uri: String,
}

impl ServiceAccountSigner {
    /// Builds a signer from the service account's RSA private key in PEM form.
    pub fn from_pem(
        client_email: impl Into<String>,
        private_key_pem: &str,
        token_uri: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            PaymentError::authentication(
                PaymentSource::Android,
                format!("Invalid service account key: {}", e),
            )
        })?;

        Ok(Self {
            client_email: client_email.into(),
            key,
            scope: ANDROID_PUBLISHER_SCOPE.to_string(),
            token_uri: token_uri.into(),
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn assertion(&self, now: Timestamp) -> Result<String, PaymentError> {
        let iat = now.as_unix_secs();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key).map_err(|e| {
            PaymentError::authentication(
                PaymentSource::Android,
                format!("Failed to sign assertion: {}", e),
            )
        })
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Timestamp,
}

impl CachedToken {
    fn is_fresh(&self, now: Timestamp) -> bool {
        now.plus_secs(REFRESH_MARGIN_SECS).is_before(&self.expires_at)
    }
}

pub struct BearerTokenCache {
    signer: ServiceAccountSigner,
    exchanger: Arc<dyn TokenExchanger>,
    slot: RwLock<Option<CachedToken>>,
}

impl BearerTokenCache {
    pub fn new(signer: ServiceAccountSigner, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            signer,
            exchanger,
            slot: RwLock::new(None),
        }
    }

    pub async fn get_token(&self) -> Result<String, PaymentError> {
        self.get_token_at(Timestamp::now()).await
    }

    async fn get_token_at(&self, now: Timestamp) -> Result<String, PaymentError> {
        {
            let slot = self.slot.read().await;
            if let Some(cached) = slot.as_ref().filter(|cached| cached.is_fresh(now)) {
                tracing::debug!("Using cached Android Publisher token");
                return Ok(cached.token.clone());
            }
        }

        let assertion = self.signer.assertion(now)?;
        let grant = self.exchanger.exchange(&assertion).await?;

        tracing::info!(
            expires_in = grant.expires_in,
            "Obtained Android Publisher access token"
        );

        let cached = CachedToken {
            token: grant.access_token,
            expires_at: now.plus_secs(grant.expires_in),
        };
        let token = cached.token.clone();
        *self.slot.write().await = Some(cached);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TokenGrant;
    use async_trait::async_trait;
    use jsonwebtoken::{DecodingKey, Validation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pub.pem");

    // ════════════════════════════════════════════════════════════════════════════
    // Test Doubles
    // ════════════════════════════════════════════════════════════════════════════

    struct CountingExchanger {
        calls: AtomicUsize,
        expires_in: i64,
        last_assertion: Mutex<Option<String>>,
        fail: bool,
    }

    impl CountingExchanger {
        fn new(expires_in: i64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                expires_in,
                last_assertion: Mutex::new(None),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                expires_in: 0,
                last_assertion: Mutex::new(None),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange(&self, assertion: &str) -> Result<TokenGrant, PaymentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_assertion.lock().unwrap() = Some(assertion.to_string());
            if self.fail {
                return Err(PaymentError::network(PaymentSource::Android, "token endpoint down"));
            }
            Ok(TokenGrant {
                access_token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    fn signer() -> ServiceAccountSigner {
        ServiceAccountSigner::from_pem("svc@project.iam.gserviceaccount.com", PRIVATE_KEY, DEFAULT_TOKEN_URI)
            .unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn assertion_carries_service_account_claims() {
        let now = Timestamp::now();
        let assertion = signer().assertion(now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        let decoded = jsonwebtoken::decode::<AssertionClaims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "svc@project.iam.gserviceaccount.com");
        assert_eq!(decoded.claims.scope, ANDROID_PUBLISHER_SCOPE);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }

    #[test]
    fn rejects_malformed_key() {
        let result = ServiceAccountSigner::from_pem("svc", "not a pem document", DEFAULT_TOKEN_URI);
        assert!(result.is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cache Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_call_exchanges_and_second_reuses() {
        let exchanger = CountingExchanger::new(3600);
        let cache = BearerTokenCache::new(signer(), exchanger.clone());

        let first = cache.get_token_at(at(1_000_000)).await.unwrap();
        let second = cache.get_token_at(at(1_000_100)).await.unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
        assert_eq!(exchanger.calls(), 1);
        assert!(exchanger.last_assertion.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn refreshes_inside_five_minute_margin() {
        let exchanger = CountingExchanger::new(3600);
        let cache = BearerTokenCache::new(signer(), exchanger.clone());
        let start = 1_000_000;

        cache.get_token_at(at(start)).await.unwrap();
        let just_outside = cache.get_token_at(at(start + 3600 - 301)).await.unwrap();
        let at_margin = cache.get_token_at(at(start + 3600 - 300)).await.unwrap();

        assert_eq!(just_outside, "token-1");
        assert_eq!(at_margin, "token-2");
        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn short_lived_grant_is_never_reused() {
        let exchanger = CountingExchanger::new(120);
        let cache = BearerTokenCache::new(signer(), exchanger.clone());

        cache.get_token_at(at(1_000_000)).await.unwrap();
        cache.get_token_at(at(1_000_001)).await.unwrap();

        assert_eq!(exchanger.calls(), 2);
    }

    #[tokio::test]
    async fn exchange_failure_propagates_and_leaves_slot_empty() {
        let exchanger = CountingExchanger::failing();
        let cache = BearerTokenCache::new(signer(), exchanger.clone());

        let err = cache.get_token_at(at(1_000_000)).await.unwrap_err();

        assert_eq!(err.source, PaymentSource::Android);
        assert!(cache.slot.read().await.is_none());
    }
}

//! OAuth token endpoint port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PaymentError;

/// Exchanges a signed JWT-bearer assertion for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, assertion: &str) -> Result<TokenGrant, PaymentError>;
}

/// Token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_exchanger_is_object_safe() {
        fn _accepts_dyn(_exchanger: &dyn TokenExchanger) {}
    }

    #[test]
    fn grant_deserializes_and_ignores_extra_fields() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(grant.access_token, "ya29.abc");
        assert_eq!(grant.expires_in, 3599);
    }
}

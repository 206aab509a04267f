//! Compact-JWT verification against an embedded `x5c` chain.

use std::collections::HashSet;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::domain::foundation::{Timestamp, ValidationError};

use super::{
    Certificate, CertificateChainVerifier, KeyAlgorithm, RootStore, SignedPayloadError, TrustError,
};

/// Number of certificates every embedded chain must carry.
pub const CHAIN_LENGTH: usize = 3;

/// A decoded, not yet verified, compact JWT.
#[derive(Debug, Clone)]
pub struct SignedPayload<'a> {
    token: &'a str,
    algorithm: Algorithm,
    chain: Vec<Certificate>,
    claims: Value,
}

impl<'a> SignedPayload<'a> {
    /// Decodes header and payload segments and parses the embedded chain.
    pub fn decode(token: &'a str) -> Result<Self, ValidationError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| ValidationError::invalid_format("signedPayload", e.to_string()))?;

        let x5c = header.x5c.unwrap_or_default();
        if x5c.len() != CHAIN_LENGTH {
            return Err(ValidationError::invalid_format(
                "x5c",
                "invalid certificate chain length",
            ));
        }
        let chain = x5c
            .iter()
            .map(|entry| Certificate::from_base64(entry))
            .collect::<Result<Vec<_>, _>>()?;

        let payload_segment = token
            .split('.')
            .nth(1)
            .ok_or_else(|| ValidationError::invalid_format("signedPayload", "missing payload"))?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_segment)
            .map_err(|e| ValidationError::invalid_format("signedPayload", e.to_string()))?;
        let claims = serde_json::from_slice(&payload)
            .map_err(|e| ValidationError::invalid_format("signedPayload", e.to_string()))?;

        Ok(Self {
            token,
            algorithm: header.alg,
            chain,
            claims,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn leaf(&self) -> &Certificate {
        &self.chain[0]
    }

    pub fn intermediate(&self) -> &Certificate {
        &self.chain[1]
    }

    pub fn root(&self) -> &Certificate {
        &self.chain[2]
    }

    /// The `exp` claim, in seconds, as an instant.
    pub fn expiration(&self) -> Option<Timestamp> {
        let exp = self.claims.get("exp")?;
        exp.as_i64()
            .or_else(|| exp.as_f64().map(|secs| secs as i64))
            .and_then(Timestamp::from_unix_secs)
    }
}

/// Verifies provider-signed compact JWTs against a pinned root set.
#[derive(Debug, Clone)]
pub struct SignedPayloadVerifier {
    roots: Arc<RootStore>,
    chain_verifier: CertificateChainVerifier,
}

impl SignedPayloadVerifier {
    pub fn new(roots: Arc<RootStore>) -> Self {
        Self {
            roots,
            chain_verifier: CertificateChainVerifier::new(),
        }
    }

    pub fn with_chain_verifier(mut self, chain_verifier: CertificateChainVerifier) -> Self {
        self.chain_verifier = chain_verifier;
        self
    }

    /// Verifies `token` and returns its typed payload.
    ///
    /// The chain is checked at the token's own expiration rather than at the
    /// current time, so recorded tokens stay verifiable until they expire.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, SignedPayloadError> {
        let signed = SignedPayload::decode(token)?;

        if !self.roots.pins(signed.root().der()) {
            warn!("signed payload root is not pinned");
            return Err(TrustError::UntrustedRoot.into());
        }

        let public_key = self.chain_verifier.verify(
            signed.leaf(),
            signed.intermediate(),
            &self.roots,
            signed.expiration(),
        )?;

        let algorithm = match (signed.algorithm(), public_key.algorithm()) {
            (Algorithm::ES256, KeyAlgorithm::EcP256) => Algorithm::ES256,
            (Algorithm::ES384, KeyAlgorithm::EcP384) => Algorithm::ES384,
            (alg, _) => {
                warn!(?alg, "signed payload algorithm does not match leaf key");
                return Err(TrustError::UnsupportedAlgorithm(format!("{:?}", alg)).into());
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let key = DecodingKey::from_ec_der(public_key.as_bytes());
        let data = jsonwebtoken::decode::<T>(signed.token, &key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::Json(_) | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                    SignedPayloadError::Invalid(ValidationError::invalid_format(
                        "signedPayload",
                        e.to_string(),
                    ))
                }
                _ => {
                    warn!(error = %e, "signed payload signature rejected");
                    TrustError::SignatureVerificationFailed.into()
                }
            }
        })?;

        Ok(data.claims)
    }
}

//! Parsed X.509 certificate value object.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::domain::foundation::{Timestamp, ValidationError};

const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";
const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

/// Key algorithm of a subject public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    EcP256,
    EcP384,
    Rsa,
    Unsupported,
}

/// Subject public key of a certificate.
///
/// For EC keys `bytes` is the uncompressed curve point; for RSA keys it is the
/// PKCS#1 `RSAPublicKey` structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The key-usage bits relevant to chain policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageFlags {
    pub digital_signature: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
}

impl KeyUsageFlags {
    /// True when the key may sign certificates or revocation lists.
    pub fn grants_ca_signing(&self) -> bool {
        self.key_cert_sign || self.crl_sign
    }
}

/// An immutable, parsed certificate.
///
/// Keeps the original DER so signatures can be re-checked and roots compared
/// byte for byte.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    not_before: i64,
    not_after: i64,
    public_key: PublicKey,
    extensions: BTreeMap<String, Vec<u8>>,
    key_usage: Option<KeyUsageFlags>,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, ValidationError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| ValidationError::invalid_format("certificate", e.to_string()))?;

        let spki = cert.public_key();
        let key_bytes = spki.subject_public_key.data.to_vec();
        let algorithm = match spki.algorithm.algorithm.to_id_string().as_str() {
            EC_PUBLIC_KEY_OID => match key_bytes.len() {
                65 => KeyAlgorithm::EcP256,
                97 => KeyAlgorithm::EcP384,
                _ => KeyAlgorithm::Unsupported,
            },
            RSA_ENCRYPTION_OID => KeyAlgorithm::Rsa,
            _ => KeyAlgorithm::Unsupported,
        };

        let key_usage = cert
            .key_usage()
            .map_err(|e| ValidationError::invalid_format("certificate", e.to_string()))?
            .map(|ext| KeyUsageFlags {
                digital_signature: ext.value.digital_signature(),
                key_cert_sign: ext.value.key_cert_sign(),
                crl_sign: ext.value.crl_sign(),
            });

        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| (ext.oid.to_id_string(), ext.value.to_vec()))
            .collect();

        let validity = cert.validity();

        Ok(Self {
            der: der.to_vec(),
            subject: cert.subject().as_raw().to_vec(),
            issuer: cert.issuer().as_raw().to_vec(),
            not_before: validity.not_before.timestamp(),
            not_after: validity.not_after.timestamp(),
            public_key: PublicKey {
                algorithm,
                bytes: key_bytes,
            },
            extensions,
            key_usage,
        })
    }

    /// Parses a base64 (standard alphabet) DER certificate, as found in `x5c`.
    pub fn from_base64(encoded: &str) -> Result<Self, ValidationError> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ValidationError::invalid_format("certificate", e.to_string()))?;
        Self::from_der(&der)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Raw DER encoding of the subject name.
    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// Raw DER encoding of the issuer name.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn key_usage(&self) -> Option<KeyUsageFlags> {
        self.key_usage
    }

    pub fn has_extension(&self, oid: &str) -> bool {
        self.extensions.contains_key(oid)
    }

    /// Returns the raw value of the extension with the given dotted OID.
    pub fn extension(&self, oid: &str) -> Option<&[u8]> {
        self.extensions.get(oid).map(Vec::as_slice)
    }

    /// Checks this certificate's signature under the issuer's public key.
    pub fn is_signed_by(&self, issuer: &Certificate) -> bool {
        let Ok((_, subject)) = X509Certificate::from_der(&self.der) else {
            return false;
        };
        let Ok((_, issuer)) = X509Certificate::from_der(&issuer.der) else {
            return false;
        };
        subject.verify_signature(Some(issuer.public_key())).is_ok()
    }

    /// Inclusive validity check widened by `skew_secs` on both ends.
    pub fn is_valid_at(&self, at: Timestamp, skew_secs: i64) -> bool {
        let at = at.as_unix_secs();
        self.not_before - skew_secs <= at && at <= self.not_after + skew_secs
    }
}

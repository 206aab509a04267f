//! Pinned root certificates.

use crate::domain::foundation::ValidationError;

use super::Certificate;

/// Apple Root CA - G3, base64 DER.
pub const APPLE_ROOT_CA_G3: &str = "MIICQzCCAcmgAwIBAgIILcX8iNLFS5UwCgYIKoZIzj0EAwMwZzEbMBkGA1UEAwwSQXBwbGUgUm9vdCBDQSAtIEczMSYwJAYDVQQLDB1BcHBsZSBDZXJ0aWZpY2F0aW9uIEF1dGhvcml0eTETMBEGA1UECgwKQXBwbGUgSW5jLjELMAkGA1UEBhMCVVMwHhcNMTQwNDMwMTgxOTA2WhcNMzkwNDMwMTgxOTA2WjBnMRswGQYDVQQDDBJBcHBsZSBSb290IENBIC0gRzMxJjAkBgNVBAsMHUFwcGxlIENlcnRpZmljYXRpb24gQXV0aG9yaXR5MRMwEQYDVQQKDApBcHBsZSBJbmMuMQswCQYDVQQGEwJVUzB2MBAGByqGSM49AgEGBSuBBAAiA2IABJjpLz1AcqTtkyJygRMc3RCV8cWjTnHcFBbZDuWmBSp3ZHtfTjjTuxxEtX/1H7YyYl3J6YRbTzBPEVoA/VhYDKX1DyxNB0cTddqXl5dvMVztK517IDvYuVTZXpmkOlEKMaNCMEAwHQYDVR0OBBYEFLuw3qFYM4iapIqZ3r6966/ayySrMA8GA1UdEwEB/wQFMAMBAf8wDgYDVR0PAQH/BAQDAgEGMAoGCCqGSM49BAMDA2gAMGUCMQCD6cHEFl4aXTQY2e3v9GwOAEZLuN+yRhHFD/3meoyhpmvOwgPUnPWTxnS4at+qIxUCMG1mihDK1A3UT82NQz60imOlM27jbdoXt2QfyFMm+YhidDkLF1vLUagM6BgD56KyKA==";

/// Immutable set of trusted roots, built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RootStore {
    roots: Vec<Certificate>,
}

impl RootStore {
    pub fn new(roots: Vec<Certificate>) -> Self {
        Self { roots }
    }

    /// Builds a store from base64 DER entries.
    pub fn from_base64<I, S>(encoded: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roots = encoded
            .into_iter()
            .map(|entry| Certificate::from_base64(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(roots))
    }

    /// Store holding only the embedded Apple Root CA - G3.
    pub fn apple() -> Result<Self, ValidationError> {
        Self::from_base64([APPLE_ROOT_CA_G3])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.roots.iter()
    }

    /// True when `der` is byte-identical to one of the pinned roots.
    pub fn pins(&self, der: &[u8]) -> bool {
        self.roots.iter().any(|root| root.der() == der)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trust::test_chain::{ChainOptions, TestChain};

    #[test]
    fn apple_store_contains_one_root() {
        let store = RootStore::apple().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn pins_requires_exact_bytes() {
        let chain = TestChain::generate(ChainOptions::default());
        let store = chain.root_store();

        assert!(store.pins(&chain.root_der));
        assert!(!store.pins(&chain.intermediate_der));

        let mut altered = chain.root_der.clone();
        let last = altered.len() - 1;
        altered[last] ^= 0x01;
        assert!(!store.pins(&altered));
    }

    #[test]
    fn from_base64_rejects_invalid_entry() {
        assert!(RootStore::from_base64(["not-base64!"]).is_err());
    }
}

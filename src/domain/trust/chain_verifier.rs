//! Fixed-depth certificate chain verification.
//!
//! Accepts exactly leaf -> intermediate -> pinned root, as issued by the App
//! Store's PKI. The chain depth and the two marker extensions are policy, so
//! there is no path building and no revocation lookup.

use tracing::warn;

use crate::domain::foundation::Timestamp;

use super::{Certificate, PublicKey, RootStore, TrustError};

/// Marks a leaf as an authorized receipt-signing certificate.
pub const RECEIPT_SIGNER_OID: &str = "1.2.840.113635.100.6.11.1";

/// Marks an intermediate as an authorized receipt-signing CA.
pub const RECEIPT_INTERMEDIATE_OID: &str = "1.2.840.113635.100.6.2.1";

/// Tolerance applied to both ends of every validity window.
pub const DEFAULT_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct CertificateChainVerifier {
    skew_secs: i64,
}

impl Default for CertificateChainVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateChainVerifier {
    pub fn new() -> Self {
        Self {
            skew_secs: DEFAULT_SKEW_SECS,
        }
    }

    pub fn with_skew_secs(skew_secs: i64) -> Self {
        Self { skew_secs }
    }

    /// Verifies the chain and returns the leaf's public key.
    ///
    /// Steps run in a fixed order and the first failure wins:
    /// root resolution, leaf signature, leaf CA check, marker extensions,
    /// then validity at `effective_date` when one is given.
    pub fn verify(
        &self,
        leaf: &Certificate,
        intermediate: &Certificate,
        roots: &RootStore,
        effective_date: Option<Timestamp>,
    ) -> Result<PublicKey, TrustError> {
        let root = roots
            .iter()
            .find(|root| intermediate.issuer() == root.subject() && intermediate.is_signed_by(root))
            .ok_or_else(|| reject(TrustError::NoTrustedRoot))?;

        if leaf.issuer() != intermediate.subject() || !leaf.is_signed_by(intermediate) {
            return Err(reject(TrustError::LeafNotSignedByIntermediate));
        }

        if leaf.key_usage().is_some_and(|usage| usage.grants_ca_signing()) {
            return Err(reject(TrustError::LeafIsCa));
        }

        if !leaf.has_extension(RECEIPT_SIGNER_OID) {
            return Err(reject(TrustError::MissingRequiredExtension {
                oid: RECEIPT_SIGNER_OID,
            }));
        }
        if !intermediate.has_extension(RECEIPT_INTERMEDIATE_OID) {
            return Err(reject(TrustError::MissingRequiredExtension {
                oid: RECEIPT_INTERMEDIATE_OID,
            }));
        }

        if let Some(at) = effective_date {
            if [leaf, intermediate, root]
                .iter()
                .any(|cert| !cert.is_valid_at(at, self.skew_secs))
            {
                return Err(reject(TrustError::NotValidAtEffectiveDate));
            }
        }

        Ok(leaf.public_key().clone())
    }
}

fn reject(err: TrustError) -> TrustError {
    warn!(reason = %err, "certificate chain rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trust::test_chain::{ChainOptions, TestChain};

    struct Parsed {
        leaf: Certificate,
        intermediate: Certificate,
        roots: RootStore,
    }

    fn parse(chain: &TestChain) -> Parsed {
        Parsed {
            leaf: Certificate::from_der(&chain.leaf_der).unwrap(),
            intermediate: Certificate::from_der(&chain.intermediate_der).unwrap(),
            roots: chain.root_store(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Happy path
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_chain_returns_leaf_public_key() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);

        let key = CertificateChainVerifier::new()
            .verify(&p.leaf, &p.intermediate, &p.roots, None)
            .unwrap();

        assert_eq!(&key, p.leaf.public_key());
    }

    #[test]
    fn valid_chain_with_effective_date_inside_window() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let at = Timestamp::from_unix_secs(p.leaf.not_before() + 86_400).unwrap();

        assert!(CertificateChainVerifier::new()
            .verify(&p.leaf, &p.intermediate, &p.roots, Some(at))
            .is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Root and signature failures
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn intermediate_from_other_root_has_no_trusted_root() {
        let chain = TestChain::generate(ChainOptions::default());
        let other = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);

        let result = CertificateChainVerifier::new().verify(
            &p.leaf,
            &p.intermediate,
            &other.root_store(),
            None,
        );

        assert_eq!(result, Err(TrustError::NoTrustedRoot));
    }

    #[test]
    fn empty_root_store_has_no_trusted_root() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);

        let result = CertificateChainVerifier::new().verify(
            &p.leaf,
            &p.intermediate,
            &RootStore::new(Vec::new()),
            None,
        );

        assert_eq!(result, Err(TrustError::NoTrustedRoot));
    }

    #[test]
    fn leaf_from_other_intermediate_is_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let other = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let foreign_leaf = Certificate::from_der(&other.leaf_der).unwrap();

        let result =
            CertificateChainVerifier::new().verify(&foreign_leaf, &p.intermediate, &p.roots, None);

        assert_eq!(result, Err(TrustError::LeafNotSignedByIntermediate));
    }

    // ══════════════════════════════════════════════════════════════
    // Policy failures
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn leaf_with_ca_signing_usage_is_rejected() {
        let chain = TestChain::generate(ChainOptions {
            leaf_is_ca: true,
            ..ChainOptions::default()
        });
        let p = parse(&chain);

        let result = CertificateChainVerifier::new().verify(&p.leaf, &p.intermediate, &p.roots, None);

        assert_eq!(result, Err(TrustError::LeafIsCa));
    }

    #[test]
    fn leaf_without_receipt_extension_is_rejected() {
        let chain = TestChain::generate(ChainOptions {
            leaf_extension: false,
            ..ChainOptions::default()
        });
        let p = parse(&chain);

        let result = CertificateChainVerifier::new().verify(&p.leaf, &p.intermediate, &p.roots, None);

        assert_eq!(
            result,
            Err(TrustError::MissingRequiredExtension {
                oid: RECEIPT_SIGNER_OID
            })
        );
    }

    #[test]
    fn intermediate_without_marker_extension_is_rejected() {
        let chain = TestChain::generate(ChainOptions {
            intermediate_extension: false,
            ..ChainOptions::default()
        });
        let p = parse(&chain);

        let result = CertificateChainVerifier::new().verify(&p.leaf, &p.intermediate, &p.roots, None);

        assert_eq!(
            result,
            Err(TrustError::MissingRequiredExtension {
                oid: RECEIPT_INTERMEDIATE_OID
            })
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Effective date
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn effective_date_at_not_after_plus_skew_is_accepted() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let at = Timestamp::from_unix_secs(p.leaf.not_after() + DEFAULT_SKEW_SECS).unwrap();

        assert!(CertificateChainVerifier::new()
            .verify(&p.leaf, &p.intermediate, &p.roots, Some(at))
            .is_ok());
    }

    #[test]
    fn effective_date_past_skew_is_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let at = Timestamp::from_unix_secs(p.leaf.not_after() + DEFAULT_SKEW_SECS + 1).unwrap();

        let result =
            CertificateChainVerifier::new().verify(&p.leaf, &p.intermediate, &p.roots, Some(at));

        assert_eq!(result, Err(TrustError::NotValidAtEffectiveDate));
    }

    #[test]
    fn effective_date_before_not_before_minus_skew_is_rejected() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let at = Timestamp::from_unix_secs(p.leaf.not_before() - DEFAULT_SKEW_SECS - 1).unwrap();

        let result =
            CertificateChainVerifier::new().verify(&p.leaf, &p.intermediate, &p.roots, Some(at));

        assert_eq!(result, Err(TrustError::NotValidAtEffectiveDate));
    }

    #[test]
    fn expired_leaf_passes_without_effective_date() {
        let chain = TestChain::generate(ChainOptions {
            leaf_years: (2016, 2017),
            ..ChainOptions::default()
        });
        let p = parse(&chain);

        assert!(CertificateChainVerifier::new()
            .verify(&p.leaf, &p.intermediate, &p.roots, None)
            .is_ok());
    }

    #[test]
    fn custom_skew_widens_window() {
        let chain = TestChain::generate(ChainOptions::default());
        let p = parse(&chain);
        let at = Timestamp::from_unix_secs(p.leaf.not_after() + 3_600).unwrap();

        assert!(CertificateChainVerifier::with_skew_secs(3_600)
            .verify(&p.leaf, &p.intermediate, &p.roots, Some(at))
            .is_ok());
    }
}

//! Error types for certificate chain and signed payload verification.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// A trust assertion could not be established.
///
/// Always fatal for the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("no trusted root")]
    NoTrustedRoot,

    #[error("root certificate is not pinned")]
    UntrustedRoot,

    #[error("leaf not signed by intermediate")]
    LeafNotSignedByIntermediate,

    #[error("leaf is a CA")]
    LeafIsCa,

    #[error("missing required extension {oid}")]
    MissingRequiredExtension { oid: &'static str },

    #[error("certificate not valid at effective date")]
    NotValidAtEffectiveDate,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,
}

/// Failure modes of [`super::SignedPayloadVerifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignedPayloadError {
    /// The token or its embedded chain is structurally malformed.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The token is well-formed but not trustworthy.
    #[error(transparent)]
    Trust(#[from] TrustError),
}

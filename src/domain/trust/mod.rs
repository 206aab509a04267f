//! Trust module - Authenticates provider-signed payloads.
//!
//! - `Certificate`: parsed X.509 value object
//! - `RootStore`: pinned roots, immutable after startup
//! - `CertificateChainVerifier`: leaf -> intermediate -> root policy
//! - `SignedPayloadVerifier`: compact JWT with an `x5c` header

mod certificate;
mod chain_verifier;
mod errors;
mod root_store;
mod signed_payload;

#[cfg(test)]
pub(crate) mod test_chain;

pub use certificate::{Certificate, KeyAlgorithm, KeyUsageFlags, PublicKey};
pub use chain_verifier::{
    CertificateChainVerifier, DEFAULT_SKEW_SECS, RECEIPT_INTERMEDIATE_OID, RECEIPT_SIGNER_OID,
};
pub use errors::{SignedPayloadError, TrustError};
pub use root_store::{RootStore, APPLE_ROOT_CA_G3};
pub use signed_payload::{SignedPayload, SignedPayloadVerifier, CHAIN_LENGTH};

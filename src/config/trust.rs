//! Trust configuration

use serde::Deserialize;

use crate::domain::trust::RootStore;

use super::error::ValidationError;

/// Pinned roots for signed App Store payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustSettings {
    /// Comma-separated base64 DER roots. Defaults to Apple Root CA - G3.
    pub root_certificates: Option<String>,
}

impl TrustSettings {
    fn entries(&self) -> Vec<&str> {
        self.root_certificates
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Builds the process-wide root store.
    pub fn root_store(&self) -> Result<RootStore, ValidationError> {
        let entries = self.entries();
        let store = if entries.is_empty() {
            RootStore::apple()
        } else {
            RootStore::from_base64(entries)
        };
        store.map_err(|e| ValidationError::InvalidRootCertificate(e.to_string()))
    }

    /// Validate trust configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.root_store().map(|_| ())
    }
}

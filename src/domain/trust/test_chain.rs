//! Three-level ECDSA chains with receipt-signing extensions, minted for tests.

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rcgen::{
    date_time_ymd, BasicConstraints, Certificate as RcgenCertificate, CertificateParams,
    CustomExtension, DistinguishedName, DnType, IsCa, KeyUsagePurpose, PKCS_ECDSA_P256_SHA256,
};
use serde::Serialize;

use super::{Certificate, RootStore};

const LEAF_OID: &[u64] = &[1, 2, 840, 113635, 100, 6, 11, 1];
const INTERMEDIATE_OID: &[u64] = &[1, 2, 840, 113635, 100, 6, 2, 1];

#[derive(Debug, Clone)]
pub(crate) struct ChainOptions {
    pub leaf_is_ca: bool,
    pub leaf_extension: bool,
    pub intermediate_extension: bool,
    /// (not_before year, not_after year) of the leaf, both on January 1st.
    pub leaf_years: (i32, i32),
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            leaf_is_ca: false,
            leaf_extension: true,
            intermediate_extension: true,
            leaf_years: (2020, 2035),
        }
    }
}

pub(crate) struct TestChain {
    pub root_der: Vec<u8>,
    pub intermediate_der: Vec<u8>,
    pub leaf_der: Vec<u8>,
    pub leaf_key_der: Vec<u8>,
}

fn params(common_name: &str, years: (i32, i32)) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new());
    params.alg = &PKCS_ECDSA_P256_SHA256;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    params.distinguished_name = dn;
    params.not_before = date_time_ymd(years.0, 1, 1);
    params.not_after = date_time_ymd(years.1, 1, 1);
    params
}

fn marker(oid: &[u64]) -> CustomExtension {
    CustomExtension::from_oid_content(oid, vec![0x05, 0x00])
}

impl TestChain {
    pub fn generate(options: ChainOptions) -> Self {
        let mut root_params = params("Test Root CA", (2015, 2045));
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        root_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let root = RcgenCertificate::from_params(root_params).unwrap();
        // Serialized once: ECDSA signatures differ per serialization.
        let root_der = root.serialize_der().unwrap();

        let mut intermediate_params = params("Test Intermediate CA", (2015, 2040));
        intermediate_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        intermediate_params.key_usages =
            vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        if options.intermediate_extension {
            intermediate_params.custom_extensions = vec![marker(INTERMEDIATE_OID)];
        }
        let intermediate = RcgenCertificate::from_params(intermediate_params).unwrap();
        let intermediate_der = intermediate.serialize_der_with_signer(&root).unwrap();

        let mut leaf_params = params("Test Receipt Signer", options.leaf_years);
        leaf_params.is_ca = IsCa::NoCa;
        leaf_params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        if options.leaf_is_ca {
            leaf_params.key_usages.push(KeyUsagePurpose::CrlSign);
            leaf_params.key_usages.push(KeyUsagePurpose::KeyCertSign);
        }
        if options.leaf_extension {
            leaf_params.custom_extensions = vec![marker(LEAF_OID)];
        }
        let leaf = RcgenCertificate::from_params(leaf_params).unwrap();
        let leaf_der = leaf.serialize_der_with_signer(&intermediate).unwrap();

        Self {
            root_der,
            intermediate_der,
            leaf_der,
            leaf_key_der: leaf.serialize_private_key_der(),
        }
    }

    pub fn root_store(&self) -> RootStore {
        RootStore::new(vec![Certificate::from_der(&self.root_der).unwrap()])
    }

    pub fn x5c(&self) -> Vec<String> {
        [&self.leaf_der, &self.intermediate_der, &self.root_der]
            .into_iter()
            .map(|der| STANDARD.encode(der))
            .collect()
    }

    /// Signs `claims` as an ES256 compact JWT carrying this chain in `x5c`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        self.sign_with_x5c(claims, self.x5c())
    }

    pub fn sign_with_x5c<T: Serialize>(&self, claims: &T, x5c: Vec<String>) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.x5c = Some(x5c);
        let key = EncodingKey::from_ec_der(&self.leaf_key_der);
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }
}

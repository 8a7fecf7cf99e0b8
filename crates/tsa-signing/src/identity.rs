//! Signing identity and keystore loading
//!
//! The TSA holds exactly one signing identity: a private key, its leaf
//! certificate and an optional chain, loaded once from a PKCS#12 container
//! during initialization and shared read-only afterwards. The container is
//! located either in bundled resources or on the filesystem, selected by a
//! path-prefix convention.

use std::collections::BTreeMap;
use std::path::PathBuf;

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    EcdsaKeyPair, RsaKeyPair, UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_ASN1,
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA256_ASN1, ECDSA_P384_SHA384_ASN1,
    ECDSA_P384_SHA384_ASN1_SIGNING, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384,
    RSA_PKCS1_2048_8192_SHA512, RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512,
};
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1,
    SECP_384_R_1, SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION,
    SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::ObjectIdentifier;
use der::{asn1::Null, Any, Decode};
use p12_keystore::{KeyStore, KeyStoreEntry};
use spki::AlgorithmIdentifierOwned;
use tsa_types::HashAlgorithm;
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// Path prefix selecting the bundled-resource keystore strategy
pub const EMBEDDED_PATH_PREFIX: &str = "embedded:";

/// Public key algorithms the TSA supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// ECDSA over P-256
    EcdsaP256,
    /// ECDSA over P-384
    EcdsaP384,
    /// RSA
    Rsa,
}

impl KeyAlgorithm {
    /// Human-readable algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::EcdsaP256 => "EC P-256",
            KeyAlgorithm::EcdsaP384 => "EC P-384",
            KeyAlgorithm::Rsa => "RSA",
        }
    }

    /// Determine the key algorithm from a certificate's SubjectPublicKeyInfo
    fn from_spki(spki: &spki::SubjectPublicKeyInfoOwned) -> Result<Self> {
        let alg_oid = spki.algorithm.oid;

        if alg_oid == ID_EC_PUBLIC_KEY {
            let params = spki.algorithm.parameters.as_ref().ok_or_else(|| {
                Error::InvalidCertificate("missing EC curve parameters".to_string())
            })?;
            let curve_oid = params.decode_as::<ObjectIdentifier>().map_err(|e| {
                Error::InvalidCertificate(format!("failed to decode EC curve OID: {}", e))
            })?;

            match curve_oid {
                SECP_256_R_1 => Ok(KeyAlgorithm::EcdsaP256),
                SECP_384_R_1 => Ok(KeyAlgorithm::EcdsaP384),
                other => Err(Error::InvalidCertificate(format!(
                    "unsupported EC curve: {}",
                    other
                ))),
            }
        } else if alg_oid == RSA_ENCRYPTION {
            Ok(KeyAlgorithm::Rsa)
        } else {
            Err(Error::InvalidCertificate(format!(
                "unsupported public key algorithm: {}",
                alg_oid
            )))
        }
    }
}

enum SigningKey {
    Ecdsa(EcdsaKeyPair),
    Rsa(RsaKeyPair),
}

/// The TSA's private key and certificate
///
/// Immutable once loaded; safe to share across concurrent signing and
/// validating operations.
pub struct SigningIdentity {
    key: SigningKey,
    algorithm: KeyAlgorithm,
    certificate: Certificate,
    certificate_der: Vec<u8>,
    chain_der: Vec<Vec<u8>>,
    public_key: Vec<u8>,
}

impl SigningIdentity {
    /// Build an identity from a PKCS#8 private key and DER certificates
    ///
    /// The first certificate is the leaf matching the private key; any
    /// remaining certificates form the chain.
    pub fn from_key_and_certificates(
        pkcs8_der: &[u8],
        certificate_der: &[u8],
        chain_der: Vec<Vec<u8>>,
    ) -> Result<Self> {
        let certificate = Certificate::from_der(certificate_der)
            .map_err(|e| Error::InvalidCertificate(format!("failed to parse certificate: {}", e)))?;

        let spki = &certificate.tbs_certificate.subject_public_key_info;
        let algorithm = KeyAlgorithm::from_spki(spki)?;

        let public_key = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::InvalidCertificate("invalid public key encoding".to_string()))?
            .to_vec();

        let key = match algorithm {
            KeyAlgorithm::EcdsaP256 => {
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8_der)
                    .map(SigningKey::Ecdsa)
                    .map_err(|e| Error::InvalidCertificate(format!("invalid EC key: {}", e)))?
            }
            KeyAlgorithm::EcdsaP384 => {
                EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, pkcs8_der)
                    .map(SigningKey::Ecdsa)
                    .map_err(|e| Error::InvalidCertificate(format!("invalid EC key: {}", e)))?
            }
            KeyAlgorithm::Rsa => RsaKeyPair::from_pkcs8(pkcs8_der)
                .map(SigningKey::Rsa)
                .map_err(|e| Error::InvalidCertificate(format!("invalid RSA key: {}", e)))?,
        };

        Ok(Self {
            key,
            algorithm,
            certificate,
            certificate_der: certificate_der.to_vec(),
            chain_der,
            public_key,
        })
    }

    /// Load an identity from a PKCS#12 container
    ///
    /// The container must hold exactly one private key entry with its
    /// certificate (optionally followed by the chain).
    pub fn from_pkcs12(pkcs12_der: &[u8], password: &str) -> Result<Self> {
        let keystore = KeyStore::from_pkcs12(pkcs12_der, password).map_err(|e| {
            Error::InvalidCertificate(format!("cannot load PKCS#12 container: {}", e))
        })?;

        let mut key_chain = None;
        for (_alias, entry) in keystore.entries() {
            if let KeyStoreEntry::PrivateKeyChain(chain) = entry {
                if key_chain.is_some() {
                    return Err(Error::InvalidCertificate(
                        "multiple key entries present in PKCS#12 container".to_string(),
                    ));
                }
                key_chain = Some(chain);
            }
        }

        let key_chain = key_chain.ok_or_else(|| {
            Error::InvalidCertificate("no key entry present in PKCS#12 container".to_string())
        })?;

        let mut certificates = key_chain.chain().iter();
        let leaf = certificates.next().ok_or_else(|| {
            Error::InvalidCertificate(
                "PKCS#12 key entry does not contain a certificate".to_string(),
            )
        })?;
        let chain_der = certificates.map(|cert| cert.as_der().to_vec()).collect();

        Self::from_key_and_certificates(key_chain.key(), leaf.as_der(), chain_der)
    }

    /// The public key algorithm of this identity
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The leaf certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The DER encoding of the leaf certificate
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The DER encodings of the chain certificates, if any
    pub fn chain_der(&self) -> &[Vec<u8>] {
        &self.chain_der
    }

    /// The raw public key bytes from the certificate's SubjectPublicKeyInfo
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The digest algorithms this identity can sign with
    ///
    /// ECDSA keys are bound to the digest of their curve; RSA keys accept
    /// any SHA-2 digest.
    pub fn supports_signing_digest(&self, digest: HashAlgorithm) -> bool {
        match self.algorithm {
            KeyAlgorithm::EcdsaP256 => digest == HashAlgorithm::Sha256,
            KeyAlgorithm::EcdsaP384 => digest == HashAlgorithm::Sha384,
            KeyAlgorithm::Rsa => matches!(
                digest,
                HashAlgorithm::Sha256 | HashAlgorithm::Sha384 | HashAlgorithm::Sha512
            ),
        }
    }

    /// The signature algorithm identifier bound to this key and digest
    pub fn signature_algorithm(&self, digest: HashAlgorithm) -> Result<AlgorithmIdentifierOwned> {
        match (self.algorithm, digest) {
            (KeyAlgorithm::EcdsaP256, HashAlgorithm::Sha256) => Ok(AlgorithmIdentifierOwned {
                oid: ECDSA_WITH_SHA_256,
                parameters: None,
            }),
            (KeyAlgorithm::EcdsaP384, HashAlgorithm::Sha384) => Ok(AlgorithmIdentifierOwned {
                oid: ECDSA_WITH_SHA_384,
                parameters: None,
            }),
            (KeyAlgorithm::Rsa, digest) => {
                let oid = match digest {
                    HashAlgorithm::Sha256 => SHA_256_WITH_RSA_ENCRYPTION,
                    HashAlgorithm::Sha384 => SHA_384_WITH_RSA_ENCRYPTION,
                    HashAlgorithm::Sha512 => SHA_512_WITH_RSA_ENCRYPTION,
                    HashAlgorithm::Sha1 => {
                        return Err(Error::Signing(
                            "SHA1 is not supported as a signing digest".to_string(),
                        ))
                    }
                };
                // RSASSA-PKCS1-v1_5 algorithm identifiers carry NULL parameters
                Ok(AlgorithmIdentifierOwned {
                    oid,
                    parameters: Some(Any::encode_from(&Null).map_err(|e| {
                        Error::Signing(format!("failed to encode parameters: {}", e))
                    })?),
                })
            }
            (algorithm, digest) => Err(Error::Signing(format!(
                "digest {} is not compatible with the {} key",
                digest,
                algorithm.name()
            ))),
        }
    }

    /// Sign a message with this identity's private key
    pub fn sign(&self, message: &[u8], digest: HashAlgorithm) -> Result<Vec<u8>> {
        if !self.supports_signing_digest(digest) {
            return Err(Error::Signing(format!(
                "digest {} is not compatible with the {} key",
                digest,
                self.algorithm.name()
            )));
        }

        let rng = SystemRandom::new();
        match &self.key {
            SigningKey::Ecdsa(key_pair) => {
                let signature = key_pair
                    .sign(&rng, message)
                    .map_err(|_| Error::Signing("ECDSA signing failed".to_string()))?;
                Ok(signature.as_ref().to_vec())
            }
            SigningKey::Rsa(key_pair) => {
                let padding = match digest {
                    HashAlgorithm::Sha256 => &RSA_PKCS1_SHA256,
                    HashAlgorithm::Sha384 => &RSA_PKCS1_SHA384,
                    HashAlgorithm::Sha512 => &RSA_PKCS1_SHA512,
                    HashAlgorithm::Sha1 => {
                        return Err(Error::Signing(
                            "SHA1 is not supported as a signing digest".to_string(),
                        ))
                    }
                };

                let mut signature = vec![0u8; key_pair.public_modulus_len()];
                key_pair
                    .sign(padding, &rng, message, &mut signature)
                    .map_err(|_| Error::Signing("RSA signing failed".to_string()))?;
                Ok(signature)
            }
        }
    }

    /// Verify a signature against this identity's public key
    ///
    /// Returns `false` for any mismatch, including digest/key combinations
    /// this identity could not have produced.
    pub fn verify_signature(&self, message: &[u8], signature: &[u8], digest: HashAlgorithm) -> bool {
        let algorithm: &'static dyn VerificationAlgorithm = match (self.algorithm, digest) {
            (KeyAlgorithm::EcdsaP256, HashAlgorithm::Sha256) => &ECDSA_P256_SHA256_ASN1,
            (KeyAlgorithm::EcdsaP384, HashAlgorithm::Sha256) => &ECDSA_P384_SHA256_ASN1,
            (KeyAlgorithm::EcdsaP384, HashAlgorithm::Sha384) => &ECDSA_P384_SHA384_ASN1,
            (KeyAlgorithm::Rsa, HashAlgorithm::Sha256) => &RSA_PKCS1_2048_8192_SHA256,
            (KeyAlgorithm::Rsa, HashAlgorithm::Sha384) => &RSA_PKCS1_2048_8192_SHA384,
            (KeyAlgorithm::Rsa, HashAlgorithm::Sha512) => &RSA_PKCS1_2048_8192_SHA512,
            _ => return false,
        };

        UnparsedPublicKey::new(algorithm, &self.public_key)
            .verify(message, signature)
            .is_ok()
    }
}

/// Where the PKCS#12 container is located
///
/// A pure function of the configured path string, decided once at
/// initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoreSource {
    /// A resource bundled with the binary
    Embedded(String),
    /// A file on the local filesystem
    Filesystem(PathBuf),
}

impl KeystoreSource {
    /// Select the loading strategy for a configured keystore path
    pub fn from_path(path: &str) -> Self {
        match path.strip_prefix(EMBEDDED_PATH_PREFIX) {
            Some(name) => KeystoreSource::Embedded(name.trim_start_matches('/').to_string()),
            None => KeystoreSource::Filesystem(PathBuf::from(path)),
        }
    }
}

/// Resources bundled with the binary, addressable by name
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources(BTreeMap<String, Vec<u8>>);

impl EmbeddedResources {
    /// An empty resource set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named resource
    pub fn with(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.0.insert(name.to_string(), bytes.into());
        self
    }

    /// Look up a resource by name
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

/// Supplies the raw bytes of the PKCS#12 container
pub trait KeystoreLoader {
    /// Read the keystore bytes
    fn load_keystore(&self) -> Result<Vec<u8>>;
}

/// Loads the keystore from the filesystem
#[derive(Debug, Clone)]
pub struct FilesystemKeystoreLoader {
    path: PathBuf,
}

impl FilesystemKeystoreLoader {
    /// Loader for the given filesystem path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeystoreLoader for FilesystemKeystoreLoader {
    fn load_keystore(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            Error::InvalidCertificate(format!(
                "cannot read PKCS#12 key store from '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// Loads the keystore from bundled resources
#[derive(Debug, Clone)]
pub struct EmbeddedKeystoreLoader {
    name: String,
    resources: EmbeddedResources,
}

impl EmbeddedKeystoreLoader {
    /// Loader for the named bundled resource
    pub fn new(name: impl Into<String>, resources: EmbeddedResources) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }
}

impl KeystoreLoader for EmbeddedKeystoreLoader {
    fn load_keystore(&self) -> Result<Vec<u8>> {
        self.resources
            .get(&self.name)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                Error::InvalidCertificate(format!("no bundled key store named '{}'", self.name))
            })
    }
}

/// Build the keystore loader for a configured path
pub fn keystore_loader(path: &str, resources: &EmbeddedResources) -> Box<dyn KeystoreLoader> {
    match KeystoreSource::from_path(path) {
        KeystoreSource::Embedded(name) => {
            Box::new(EmbeddedKeystoreLoader::new(name, resources.clone()))
        }
        KeystoreSource::Filesystem(path) => Box::new(FilesystemKeystoreLoader::new(path)),
    }
}

/// Load the signing identity through a keystore loader
pub fn load_identity(loader: &dyn KeystoreLoader, password: Option<&str>) -> Result<SigningIdentity> {
    let pkcs12_der = loader.load_keystore()?;
    SigningIdentity::from_pkcs12(&pkcs12_der, password.unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_prefix_selects_embedded_strategy() {
        assert_eq!(
            KeystoreSource::from_path("embedded:/store.p12"),
            KeystoreSource::Embedded("store.p12".to_string())
        );
    }

    #[test]
    fn test_other_paths_select_filesystem_strategy() {
        assert_eq!(
            KeystoreSource::from_path("/etc/tsa/store.p12"),
            KeystoreSource::Filesystem(PathBuf::from("/etc/tsa/store.p12"))
        );
        assert_eq!(
            KeystoreSource::from_path("relative/store.p12"),
            KeystoreSource::Filesystem(PathBuf::from("relative/store.p12"))
        );
    }

    #[test]
    fn test_embedded_loader_resolves_registered_resource() {
        let resources = EmbeddedResources::new().with("store.p12", vec![0x01, 0x02]);
        let loader = EmbeddedKeystoreLoader::new("store.p12", resources);
        assert_eq!(loader.load_keystore().unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_embedded_loader_fails_for_unknown_resource() {
        let loader = EmbeddedKeystoreLoader::new("missing.p12", EmbeddedResources::new());
        assert!(matches!(
            loader.load_keystore(),
            Err(Error::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_filesystem_loader_fails_for_missing_file() {
        let loader = FilesystemKeystoreLoader::new("/nonexistent/store.p12");
        assert!(matches!(
            loader.load_keystore(),
            Err(Error::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_garbage_pkcs12_is_rejected() {
        let result = SigningIdentity::from_pkcs12(&[0xde, 0xad, 0xbe, 0xef], "");
        assert!(matches!(result, Err(Error::InvalidCertificate(_))));
    }
}

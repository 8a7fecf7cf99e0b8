//! Operator configuration for the time-stamp authority
//!
//! Configuration is plain data deserialized by the embedding application.
//! Validation is performed by ordinary functions returning structured
//! violations; the engine refuses to initialize from an invalid
//! configuration.

use const_oid::ObjectIdentifier;
use serde::Deserialize;
use tsa_types::HashAlgorithm;

/// Default policy OID tokens are issued under
pub const DEFAULT_POLICY_OID: &str = "1.2";

/// Configuration of the signing keystore
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeystoreConfig {
    /// Path to the PKCS#12 container; an `embedded:` prefix selects the
    /// bundled-resource strategy, anything else is a filesystem path
    pub path: String,
    /// Password of the PKCS#12 container; empty by default
    #[serde(default)]
    pub password: Option<String>,
}

/// Configuration surface of the time-stamp authority
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TsaConfig {
    /// The keystore holding the signing key and certificate
    pub keystore: KeystoreConfig,
    /// The OID of the policy under which responses are produced
    pub policy_oid: String,
    /// Digest algorithms accepted in incoming requests, as names or OIDs
    pub accepted_hash_algorithms: Vec<String>,
    /// Digest algorithm of the `ESSCertIDv2` certificate identifier
    pub ess_cert_id_algorithm: String,
    /// Digest algorithm used when signing with an RSA key
    pub signing_digest_algorithm: String,
}

impl Default for TsaConfig {
    fn default() -> Self {
        Self {
            keystore: KeystoreConfig {
                path: String::new(),
                password: None,
            },
            policy_oid: DEFAULT_POLICY_OID.to_string(),
            accepted_hash_algorithms: vec!["SHA256".to_string(), "SHA512".to_string()],
            ess_cert_id_algorithm: "SHA256".to_string(),
            signing_digest_algorithm: "SHA256".to_string(),
        }
    }
}

/// A single configuration constraint violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    /// The offending configuration field
    pub field: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl std::fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl TsaConfig {
    /// Check every constraint and collect the violations
    ///
    /// An empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<ConfigViolation> {
        let mut violations = Vec::new();

        if self.keystore.path.trim().is_empty() {
            violations.push(ConfigViolation {
                field: "keystore.path",
                message: "must not be empty".to_string(),
            });
        }

        if self.policy_oid.trim().is_empty() {
            violations.push(ConfigViolation {
                field: "policy-oid",
                message: "must not be empty".to_string(),
            });
        } else if ObjectIdentifier::new(&self.policy_oid).is_err() {
            violations.push(ConfigViolation {
                field: "policy-oid",
                message: format!("'{}' is not a valid object identifier", self.policy_oid),
            });
        }

        if self.accepted_hash_algorithms.is_empty() {
            violations.push(ConfigViolation {
                field: "accepted-hash-algorithms",
                message: "must not be empty".to_string(),
            });
        }

        for identifier in &self.accepted_hash_algorithms {
            if !is_valid_digest_algorithm_identifier(identifier) {
                violations.push(ConfigViolation {
                    field: "accepted-hash-algorithms",
                    message: format!("'{identifier}' is not a digest algorithm"),
                });
            }
        }

        for (field, identifier) in [
            ("ess-cert-id-algorithm", &self.ess_cert_id_algorithm),
            ("signing-digest-algorithm", &self.signing_digest_algorithm),
        ] {
            if !is_valid_digest_algorithm_identifier(identifier) {
                violations.push(ConfigViolation {
                    field,
                    message: format!("'{identifier}' is not a digest algorithm"),
                });
            }
        }

        violations
    }
}

/// Decide whether an operator-supplied value names a digest algorithm
///
/// Blank values are acceptable: optional configuration fields are valid
/// when unset. A non-blank value must resolve through the hash algorithm
/// registry, either by canonical name or by OID. OIDs of composite
/// signature-with-digest algorithms do not resolve and are rejected.
pub fn is_valid_digest_algorithm_identifier(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }

    match HashAlgorithm::resolve(trimmed) {
        Some(_) => true,
        None => {
            tracing::debug!(identifier = trimmed, "no digest algorithm found for identifier");
            false
        }
    }
}

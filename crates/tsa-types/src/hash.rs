//! Hash algorithm registry
//!
//! Maps digest algorithm object identifiers to canonical names and expected
//! digest lengths. The registry is a fixed, process-lifetime set; lookups
//! are pure and simply return `None` for unknown identifiers.

use serde::{Deserialize, Serialize};

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1
    #[serde(rename = "SHA1")]
    Sha1,
    /// SHA-256
    #[serde(rename = "SHA256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "SHA384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Every algorithm in the registry.
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// Get the expected digest size in bytes for this algorithm
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Get the dotted-decimal OID for this algorithm
    pub fn oid(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "1.3.14.3.2.26",
            HashAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            HashAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            HashAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Get the canonical name for this algorithm
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Look up an algorithm by its dotted-decimal OID
    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|algorithm| algorithm.oid() == oid)
    }

    /// Look up an algorithm by its canonical name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(name))
    }

    /// Resolve an identifier that is either a canonical name or an OID
    pub fn resolve(identifier: &str) -> Option<Self> {
        Self::from_name(identifier).or_else(|| Self::from_oid(identifier))
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_oid() {
        assert_eq!(
            HashAlgorithm::from_oid("2.16.840.1.101.3.4.2.1"),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(HashAlgorithm::from_oid("1.3.14.3.2.26"), Some(HashAlgorithm::Sha1));
        assert_eq!(HashAlgorithm::from_oid("1.2.3.4"), None);
    }

    #[test]
    fn test_resolve_by_name_case_insensitive() {
        assert_eq!(HashAlgorithm::from_name("sha512"), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_name("Sha256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_name("MD5"), None);
    }

    #[test]
    fn test_resolve_accepts_either_form() {
        assert_eq!(
            HashAlgorithm::resolve("SHA384"),
            HashAlgorithm::resolve("2.16.840.1.101.3.4.2.2")
        );
    }

    #[test]
    fn test_signature_algorithm_oid_is_not_a_digest() {
        // ecdsa-with-SHA256 must not resolve even though it names a digest
        assert_eq!(HashAlgorithm::from_oid("1.2.840.10045.4.3.2"), None);
    }

    #[test]
    fn test_digest_sizes() {
        assert_eq!(HashAlgorithm::Sha1.digest_size(), 20);
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest_size(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
    }
}

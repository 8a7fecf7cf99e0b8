//! Digest computation for registry algorithms

use aws_lc_rs::digest;
use tsa_types::HashAlgorithm;

/// Hash data with a registry algorithm
pub fn compute_digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let digest_algorithm = match algorithm {
        HashAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha384 => &digest::SHA384,
        HashAlgorithm::Sha512 => &digest::SHA512,
    };

    digest::digest(digest_algorithm, data).as_ref().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_lengths_match_registry() {
        for algorithm in HashAlgorithm::ALL {
            let digest = compute_digest(algorithm, b"hello");
            assert_eq!(digest.len(), algorithm.digest_size());
        }
    }

    #[test]
    fn test_sha256_known_answer() {
        let digest = compute_digest(HashAlgorithm::Sha256, b"hello");
        let expected =
            hex::decode("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
                .unwrap();
        assert_eq!(digest, expected);
    }
}

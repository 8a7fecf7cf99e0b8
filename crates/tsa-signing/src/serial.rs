//! Serial number generation for issued responses
//!
//! The default policy draws 64 bits from the system CSPRNG and masks the
//! sign bit. Uniqueness is a probabilistic property of the underlying
//! random source; no bookkeeping is performed to enforce it.

use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use num_bigint::BigUint;

use crate::error::{Error, Result};

/// Produces the serial number embedded in each issued response
///
/// Implementations must be safe under concurrent invocation from multiple
/// simultaneous signing operations; serials need not be monotonic.
pub trait SerialNumberGenerator: Send + Sync {
    /// The next serial number, always non-negative
    fn next_serial(&self) -> Result<BigUint>;
}

/// Generates random serial numbers from the system CSPRNG
pub struct RandomSerialNumberGenerator {
    rng: SystemRandom,
}

impl RandomSerialNumberGenerator {
    /// Create a new generator backed by the system CSPRNG
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for RandomSerialNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialNumberGenerator for RandomSerialNumberGenerator {
    fn next_serial(&self) -> Result<BigUint> {
        let mut bytes = [0u8; 8];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| Error::Signing("random source failure".to_string()))?;

        // Mask the sign bit so the serial stays non-negative
        bytes[0] &= 0x7f;

        Ok(BigUint::from_bytes_be(&bytes))
    }
}

/// Generator returning a fixed value, for deterministic tests
#[derive(Debug, Clone)]
pub struct FixedSerialNumberGenerator(pub BigUint);

impl SerialNumberGenerator for FixedSerialNumberGenerator {
    fn next_serial(&self) -> Result<BigUint> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_serial_is_non_negative_and_bounded() {
        let generator = RandomSerialNumberGenerator::new();
        for _ in 0..100 {
            let serial = generator.next_serial().unwrap();
            assert!(serial.bits() <= 63, "sign bit must be masked");
        }
    }

    #[test]
    fn test_fixed_serial_repeats() {
        let generator = FixedSerialNumberGenerator(BigUint::from(1234u32));
        assert_eq!(generator.next_serial().unwrap(), BigUint::from(1234u32));
        assert_eq!(generator.next_serial().unwrap(), BigUint::from(1234u32));
    }
}

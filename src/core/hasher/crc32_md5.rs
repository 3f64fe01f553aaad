//! CRC-32 / MD5 hash provider.

use super::{HashProvider, ProviderKind, DEFAULT_SLOW_COST};
use crate::error::HashError;
use md5::{Digest, Md5};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// The classic signer pair.
///
/// - `hash_a`: CRC-32 (IEEE), rendered in decimal
/// - `hash_b`: MD5, rendered as 32 lowercase hex digits, after sleeping
///   for `slow_cost`
///
/// With this provider the pipeline reproduces the well-known signatures,
/// e.g. item `0` passes the pair stage as `4108050209~502633748`.
#[derive(Debug, Clone)]
pub struct Crc32Md5Provider {
    slow_cost: Duration,
}

impl Crc32Md5Provider {
    /// Create a provider with the default slow-hash cost
    pub fn new() -> Self {
        Self {
            slow_cost: DEFAULT_SLOW_COST,
        }
    }

    /// Set the artificial cost of each slow-hash call
    pub fn slow_cost(mut self, cost: Duration) -> Self {
        self.slow_cost = cost;
        self
    }
}

impl Default for Crc32Md5Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl HashProvider for Crc32Md5Provider {
    fn hash_a(&self, text: &str) -> Result<String, HashError> {
        let hash = crc32fast::hash(text.as_bytes()).to_string();
        trace!(input = text, %hash, "hash_a");
        Ok(hash)
    }

    fn hash_b(&self, text: &str) -> Result<String, HashError> {
        if !self.slow_cost.is_zero() {
            thread::sleep(self.slow_cost);
        }
        let hash = hex::encode(Md5::digest(text.as_bytes()));
        trace!(input = text, %hash, "hash_b");
        Ok(hash)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Crc32Md5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Crc32Md5Provider {
        Crc32Md5Provider::new().slow_cost(Duration::ZERO)
    }

    #[test]
    fn fast_hash_is_decimal_crc32() {
        assert_eq!(provider().hash_a("0").unwrap(), "4108050209");
    }

    #[test]
    fn slow_hash_is_hex_md5() {
        assert_eq!(
            provider().hash_b("0").unwrap(),
            "cfcd208495d565ef66e7dff9f98764da"
        );
    }

    #[test]
    fn fast_of_slow_matches_known_value() {
        let provider = provider();
        let slow = provider.hash_b("0").unwrap();
        assert_eq!(provider.hash_a(&slow).unwrap(), "502633748");
    }
}

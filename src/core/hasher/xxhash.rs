//! xxh3-backed hash provider.

use super::{HashProvider, ProviderKind};
use crate::error::HashError;
use std::thread;
use std::time::Duration;
use tracing::trace;
use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

/// Default cost charged to every slow-hash call
pub const DEFAULT_SLOW_COST: Duration = Duration::from_millis(10);

/// Hash provider built on xxh3.
///
/// - `hash_a`: 64-bit xxh3, rendered in decimal
/// - `hash_b`: 128-bit xxh3, rendered as 32 hex digits, after sleeping
///   for `slow_cost` to stand in for an expensive external dependency
#[derive(Debug, Clone)]
pub struct XxHashProvider {
    slow_cost: Duration,
}

impl XxHashProvider {
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

impl Default for XxHashProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HashProvider for XxHashProvider {
    fn hash_a(&self, text: &str) -> Result<String, HashError> {
        let hash = xxh3_64(text.as_bytes()).to_string();
        trace!(input = text, %hash, "hash_a");
        Ok(hash)
    }

    fn hash_b(&self, text: &str) -> Result<String, HashError> {
        if !self.slow_cost.is_zero() {
            thread::sleep(self.slow_cost);
        }
        let hash = format!("{:032x}", xxh3_128(text.as_bytes()));
        trace!(input = text, %hash, "hash_b");
        Ok(hash)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::XxHash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn hashes_are_deterministic() {
        let provider = XxHashProvider::new().slow_cost(Duration::ZERO);
        assert_eq!(provider.hash_a("0").unwrap(), provider.hash_a("0").unwrap());
        assert_eq!(provider.hash_b("0").unwrap(), provider.hash_b("0").unwrap());
        assert_ne!(provider.hash_a("0").unwrap(), provider.hash_a("1").unwrap());
    }

    #[test]
    fn fast_hash_is_decimal() {
        let provider = XxHashProvider::new();
        let hash = provider.hash_a("signer").unwrap();
        assert!(hash.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(hash.parse::<u64>().unwrap(), xxh3_64(b"signer"));
    }

    #[test]
    fn slow_hash_is_fixed_width_hex() {
        let provider = XxHashProvider::new().slow_cost(Duration::ZERO);
        let hash = provider.hash_b("").unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn slow_hash_charges_its_cost() {
        let provider = XxHashProvider::new().slow_cost(Duration::from_millis(20));
        let start = Instant::now();
        provider.hash_b("x").unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}

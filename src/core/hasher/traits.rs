//! Trait definitions for hash providers.

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two string-to-string hash functions the pipeline is built around.
///
/// Both functions must be deterministic. `hash_a` may be called from any
/// number of threads at once. `hash_b` models a scarce resource: the
/// pipeline only ever calls it while holding a [`Throttle`] permit.
///
/// [`Throttle`]: crate::core::throttle::Throttle
pub trait HashProvider: Send + Sync {
    /// The fast, freely parallel hash
    fn hash_a(&self, text: &str) -> Result<String, HashError>;

    /// The slow, throttled hash
    fn hash_b(&self, text: &str) -> Result<String, HashError>;

    /// Get the provider kind
    fn kind(&self) -> ProviderKind;
}

impl<P: HashProvider + ?Sized> HashProvider for Arc<P> {
    fn hash_a(&self, text: &str) -> Result<String, HashError> {
        (**self).hash_a(text)
    }

    fn hash_b(&self, text: &str) -> Result<String, HashError> {
        (**self).hash_b(text)
    }

    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }
}

/// Available hash providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// xxh3-based provider with an artificial cost on the slow hash
    XxHash,
    /// CRC-32 fast hash, MD5 slow hash
    Crc32Md5,
    /// Prefixing stub (`A:` / `B:`), useful for reading pipeline output
    Label,
    /// Anything supplied by the caller
    Custom,
}

impl ProviderKind {
    /// Get a human-readable description of the provider
    pub fn description(&self) -> &'static str {
        match self {
            ProviderKind::XxHash => {
                "xxh3 - 64-bit decimal fast hash, 128-bit hex slow hash with simulated cost"
            }
            ProviderKind::Crc32Md5 => {
                "crc32-md5 - CRC-32 decimal fast hash, MD5 hex slow hash with simulated cost"
            }
            ProviderKind::Label => "Label - prefixes input with 'A:' or 'B:'",
            ProviderKind::Custom => "Custom provider",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::XxHash => write!(f, "xxh3"),
            ProviderKind::Crc32Md5 => write!(f, "crc32-md5"),
            ProviderKind::Label => write!(f, "label"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

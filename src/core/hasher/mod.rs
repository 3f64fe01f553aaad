//! # Hasher Module
//!
//! The hash functions the pipeline signs items with.
//!
//! ## Providers
//! - **xxh3** - Fast 64-bit hash, slow 128-bit hash with a simulated cost
//! - **crc32-md5** - CRC-32 fast hash, MD5 slow hash with a simulated cost
//! - **label** - Prefixing stub for tests and demos
//!
//! ## Example
//! ```rust,ignore
//! use hash_signer::core::hasher::{HashProvider, XxHashProvider};
//!
//! let provider = XxHashProvider::new().slow_cost(Duration::from_millis(5));
//! let signature = provider.hash_a(&provider.hash_b("42")?)?;
//! ```

mod crc32_md5;
mod label;
mod traits;
mod xxhash;

pub use crc32_md5::Crc32Md5Provider;
pub use label::LabelHashProvider;
pub use traits::{HashProvider, ProviderKind};
pub use xxhash::{XxHashProvider, DEFAULT_SLOW_COST};

use std::sync::Arc;

/// Build a shared provider of the given kind with default settings.
///
/// Returns `None` for [`ProviderKind::Custom`], which has no default.
pub fn provider_for(kind: ProviderKind) -> Option<Arc<dyn HashProvider>> {
    match kind {
        ProviderKind::XxHash => Some(Arc::new(XxHashProvider::new())),
        ProviderKind::Crc32Md5 => Some(Arc::new(Crc32Md5Provider::new())),
        ProviderKind::Label => Some(Arc::new(LabelHashProvider)),
        ProviderKind::Custom => None,
    }
}

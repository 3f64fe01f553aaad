//! # Hash Signer
//!
//! A concurrent pipeline that signs a stream of items with two hash
//! functions and merges the results into one reproducible value.
//!
//! ## Core Guarantees
//! - **One slow hash at a time** - every slow-hash call runs under a shared permit
//! - **Fixed joins** - fast branch before slow branch, fan-out parts in index order
//! - **Deterministic output** - the final merge sorts, so scheduling never shows
//!
//! ## Architecture
//! - `core` - Relays, throttle, stages and the executor
//! - `events` - Progress events for observers
//! - `error` - Typed errors; the first fault cancels the run

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SignerError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. The filter is
/// read from `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

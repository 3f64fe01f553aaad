//! # Core Module
//!
//! The signing engine.
//!
//! ## Modules
//! - `item` - Values flowing between stages
//! - `hasher` - Fast and slow hash providers
//! - `throttle` - Permit pool limiting concurrent slow hashes
//! - `relay` - Bounded conduits and run cancellation
//! - `pipeline` - Stage executor and the signing stages

pub mod hasher;
pub mod item;
pub mod pipeline;
pub mod relay;
pub mod throttle;

// Re-export commonly used types
pub use hasher::{HashProvider, ProviderKind};
pub use item::Item;
pub use pipeline::{Pipeline, PipelineConfig, Signer};
pub use relay::CancellationToken;

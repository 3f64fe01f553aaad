//! # Pipeline Module
//!
//! Runs stages concurrently, connected by bounded relays.
//!
//! ## Signing Stages
//! 1. **Source** - Feed the input items
//! 2. **Pair hash** - `A(x) ~ A(B(x))`, slow hash throttled run-wide
//! 3. **Sextet hash** - `A(0x) + A(1x) + ... + A(5x)` in index order
//! 4. **Merge** - Sort everything and join it into one value
//!
//! ## Concurrency
//! One thread per stage, one scoped thread per item inside the hash
//! stages and per fan-out call in the sextet stage, and the rayon pool
//! for the merge sort. The first fault cancels the run; every blocking
//! point observes the cancellation.

mod config;
mod context;
mod executor;
mod signer;
mod stage;
mod stages;

pub use config::PipelineConfig;
pub use context::{StageContext, TaskGroup};
pub use executor::{Pipeline, PipelineBuilder, RunOutput};
pub use signer::{Signer, SignerBuilder};
pub use stage::{FnStage, IterSource, Stage};
pub use stages::{MergeStage, PairHashStage, SextetHashStage};

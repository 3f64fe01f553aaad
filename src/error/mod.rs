//! # Error Module
//!
//! Typed errors for the hash-signing pipeline.
//!
//! ## Design Principles
//! - **Never abort the process** - stage faults become values, not panics
//! - **First fault wins** - the run reports the error that cancelled it
//! - **Include context** - which hash function, which stage, which input

use thiserror::Error;

/// Top-level pipeline error
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Malformed item: {0}")]
    Item(#[from] ItemError),

    #[error("Throttle error: {0}")]
    Throttle(#[from] ThrottleError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}

impl SignerError {
    /// True when the error only reports that the run was torn down,
    /// as opposed to being the fault that caused the teardown.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            SignerError::Throttle(ThrottleError::Cancelled)
                | SignerError::Relay(RelayError::Cancelled)
                | SignerError::Pipeline(PipelineError::Cancelled)
        )
    }
}

/// Faults raised by a hash provider
#[derive(Error, Debug)]
pub enum HashError {
    #[error("{function} failed for input {input:?}: {reason}")]
    Failed {
        function: &'static str,
        input: String,
        reason: String,
    },

    #[error("{function} panicked: {message}")]
    Panicked {
        function: &'static str,
        message: String,
    },
}

/// Items that cannot be turned into text
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("item is not valid text: {reason}")]
    NotText { reason: String },
}

/// Errors acquiring a permit from the slow-hash throttle
#[derive(Error, Debug)]
pub enum ThrottleError {
    #[error("no permit was released while waiting {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("run was cancelled while waiting for a permit")]
    Cancelled,
}

/// Errors moving items through a relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("run was cancelled while waiting on a relay")]
    Cancelled,

    #[error("downstream stage stopped receiving")]
    Disconnected,
}

/// Errors from the pipeline executor itself
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("pipeline has no stages")]
    EmptyPipeline,

    #[error("stage '{stage}' panicked: {message}")]
    StagePanicked { stage: String, message: String },

    #[error("run was cancelled")]
    Cancelled,

    #[error("pipeline finished without producing a result")]
    MissingOutput,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SignerError>;

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
